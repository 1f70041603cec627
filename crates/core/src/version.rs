//! Resolved-version lookup.

use tokio::process::Command;
use tracing::debug;

/// Sentinel used when no explicit version is set and the working tree has
/// no usable revision-control state.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Derive a version label from the working tree via `git describe`.
///
/// Never fails: a missing `git` binary, a non-repository working tree, or
/// empty output all yield [`UNKNOWN_VERSION`].
pub async fn describe_working_tree() -> String {
  let output = Command::new("git")
    .args(["describe", "--tags", "--always"])
    .output()
    .await;

  match output {
    Ok(out) if out.status.success() => {
      let label = String::from_utf8_lossy(&out.stdout).trim().to_string();
      if label.is_empty() {
        UNKNOWN_VERSION.to_string()
      } else {
        label
      }
    }
    Ok(out) => {
      debug!(code = ?out.status.code(), "git describe failed");
      UNKNOWN_VERSION.to_string()
    }
    Err(err) => {
      debug!(error = %err, "git unavailable");
      UNKNOWN_VERSION.to_string()
    }
  }
}
