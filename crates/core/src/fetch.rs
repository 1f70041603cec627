//! Source image acquisition: cache lookup, streaming download, and
//! manifest verification.
//!
//! The acquirer returns a local path that best-effort matches the
//! published digest: cached files are re-verified before reuse, mismatched
//! files are deleted and re-fetched, and a manifest that cannot be fetched
//! downgrades to a warning when a local file is already on disk.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tracing::{info, warn};

use crate::checksum;
use crate::hash::sha256_file;
use crate::{CoreError, Result};

/// Cache directory for downloaded base images, relative to the working
/// directory.
pub const CACHE_DIR: &str = ".cache";

/// An acquired source image.
#[derive(Debug)]
pub struct AcquiredImage {
  /// Local path to the (possibly still compressed) base image.
  pub path: PathBuf,
  /// Digest from the manifest, when the manifest could be fetched.
  pub digest: Option<String>,
}

/// Derive the cache key from a source URL: its final path segment.
pub fn cache_key(url: &str) -> Result<&str> {
  url
    .split('?')
    .next()
    .unwrap_or(url)
    .rsplit('/')
    .next()
    .filter(|s| !s.is_empty())
    .ok_or_else(|| CoreError::Config(format!("source url has no filename: {url}")))
}

/// Acquire the source image, preferring a verified cached copy.
///
/// 1. A cached file whose digest matches the manifest is returned as-is.
/// 2. A cached file that mismatches is deleted and re-downloaded.
/// 3. A fresh download that mismatches is deleted and the run aborts.
///
/// When the manifest itself cannot be fetched, the local file (cached or
/// freshly downloaded) is returned unverified with a warning.
pub async fn acquire(source_url: &str, checksum_url: &str, cache_dir: &Path) -> Result<AcquiredImage> {
  let filename = cache_key(source_url)?;
  fs::create_dir_all(cache_dir)?;
  let local = cache_dir.join(filename);

  if local.exists() {
    info!(path = %local.display(), "found cached image");
    match checksum::expected_digest(checksum_url, filename).await {
      Ok(expected) => {
        if digest_matches(&local, &expected)? {
          info!("checksum verified, cached image is valid");
          return Ok(AcquiredImage {
            path: local,
            digest: Some(expected),
          });
        }
        warn!("cached image checksum mismatch, re-downloading");
        fs::remove_file(&local)?;
      }
      Err(err) => {
        warn!(error = %err, "could not verify cached image, proceeding with it");
        return Ok(AcquiredImage {
          path: local,
          digest: None,
        });
      }
    }
  }

  download(source_url, &local).await?;

  match checksum::expected_digest(checksum_url, filename).await {
    Ok(expected) => {
      info!(path = %local.display(), "verifying checksum");
      let actual = sha256_file(&local)?;
      if !actual.eq_ignore_ascii_case(&expected) {
        fs::remove_file(&local)?;
        return Err(CoreError::ChecksumMismatch { expected, actual });
      }
      info!("checksum verified");
      Ok(AcquiredImage {
        path: local,
        digest: Some(expected),
      })
    }
    Err(err) => {
      warn!(error = %err, "could not verify downloaded image");
      Ok(AcquiredImage {
        path: local,
        digest: None,
      })
    }
  }
}

fn digest_matches(path: &Path, expected: &str) -> Result<bool> {
  info!(path = %path.display(), "verifying checksum");
  let actual = sha256_file(path)?;
  Ok(actual.eq_ignore_ascii_case(expected))
}

/// Stream `url` into `dest`, reporting percentage progress as bytes
/// arrive. The transfer lands in a `.part` file first so an interrupted
/// download never masquerades as a cached image.
async fn download(url: &str, dest: &Path) -> Result<()> {
  info!(url = %url, dest = %dest.display(), "downloading");

  let response = reqwest::get(url).await?.error_for_status()?;
  let total = response.content_length().unwrap_or(0);

  let mut part_name = dest.file_name().map(OsString::from).unwrap_or_default();
  part_name.push(".part");
  let part = dest.with_file_name(part_name);

  let mut file = File::create(&part)?;
  let mut stream = response.bytes_stream();
  let mut progress = Progress::new(total);

  while let Some(chunk) = stream.next().await {
    let chunk = chunk?;
    file.write_all(&chunk)?;
    progress.advance(chunk.len() as u64);
  }

  file.flush()?;
  drop(file);
  fs::rename(&part, dest)?;

  progress.finish();
  Ok(())
}

/// Percentage progress for a streaming download, logged in 10% steps to
/// keep the event stream readable for multi-gigabyte images.
struct Progress {
  total: u64,
  received: u64,
  reported: u64,
}

impl Progress {
  fn new(total: u64) -> Self {
    Self {
      total,
      received: 0,
      reported: 0,
    }
  }

  fn advance(&mut self, bytes: u64) {
    self.received += bytes;
    if self.total == 0 {
      return;
    }
    let percent = (self.received * 100 / self.total).min(100);
    if percent >= self.reported + 10 {
      self.reported = percent - percent % 10;
      info!(
        "progress: {}% ({} / {} MB)",
        self.reported,
        self.received / (1024 * 1024),
        self.total / (1024 * 1024)
      );
    }
  }

  fn finish(&self) {
    info!("download complete ({} MB)", self.received / (1024 * 1024));
  }
}
