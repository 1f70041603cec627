//! Published checksum manifests (SHA256SUMS files).

use tracing::debug;

use crate::{CoreError, Result};

/// A parsed checksum manifest: one `<hex-digest> <filename>` record per
/// line, with an optional leading `*` on the filename (binary-mode marker
/// emitted by `sha256sum -b`).
#[derive(Debug, Clone, Default)]
pub struct ChecksumManifest {
  entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone)]
struct ManifestEntry {
  digest: String,
  filename: String,
}

impl ChecksumManifest {
  /// Parse manifest text. Lines without at least a digest and a filename
  /// are skipped.
  pub fn parse(text: &str) -> Self {
    let mut entries = Vec::new();

    for line in text.lines() {
      let mut parts = line.split_whitespace();
      let (Some(digest), Some(name)) = (parts.next(), parts.next()) else {
        continue;
      };
      entries.push(ManifestEntry {
        digest: digest.to_ascii_lowercase(),
        filename: name.trim_start_matches('*').to_string(),
      });
    }

    Self { entries }
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Look up the digest for a file.
  ///
  /// Manifest entries and the requested name are matched by substring in
  /// either direction, so a manifest listing a relative path still
  /// resolves a bare filename.
  pub fn digest_for(&self, filename: &str) -> Option<&str> {
    self
      .entries
      .iter()
      .find(|e| e.filename.contains(filename) || filename.contains(e.filename.as_str()))
      .map(|e| e.digest.as_str())
  }
}

/// Fetch and parse the manifest at `url`.
pub async fn fetch_manifest(url: &str) -> Result<ChecksumManifest> {
  debug!(url = %url, "fetching checksum manifest");
  let response = reqwest::get(url).await?.error_for_status()?;
  let text = response.text().await?;
  Ok(ChecksumManifest::parse(&text))
}

/// Fetch the manifest at `url` and resolve the digest for one file.
pub async fn expected_digest(url: &str, filename: &str) -> Result<String> {
  let manifest = fetch_manifest(url).await?;
  manifest
    .digest_for(filename)
    .map(str::to_string)
    .ok_or_else(|| CoreError::ChecksumNotFound {
      filename: filename.to_string(),
    })
}
