//! Error types for tb3img-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while preparing or running a build.
#[derive(Debug, Error)]
pub enum CoreError {
  /// Configuration file missing, unreadable as TOML, or otherwise unusable.
  #[error("configuration error: {0}")]
  Config(String),

  /// A configuration field holds a value outside its allowed set.
  #[error("invalid {field}: {value} (must be one of: {allowed})")]
  Validation {
    field: &'static str,
    value: String,
    allowed: String,
  },

  /// A finished image for this name/model/version already exists.
  #[error("output file already exists: {0}")]
  OutputExists(PathBuf),

  /// sudo is unavailable and the interactive prompt was refused.
  #[error("sudo permissions are required")]
  PrivilegeRequired,

  /// Freshly downloaded image did not match the published digest.
  #[error("checksum mismatch: expected {expected}, got {actual}")]
  ChecksumMismatch { expected: String, actual: String },

  /// The checksum manifest has no entry for the requested file.
  #[error("no checksum entry for {filename}")]
  ChecksumNotFound { filename: String },

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// A spawned external tool exited with a non-zero status.
  #[error("{tool} exited with status {code:?}")]
  ExternalTool { tool: String, code: Option<i32> },

  /// The user interrupted a running subprocess.
  #[error("build interrupted")]
  Interrupted,
}
