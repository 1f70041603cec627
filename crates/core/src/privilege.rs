//! Privileged-execution checks.
//!
//! The containerized builder mounts `/dev` and repartitions loop devices,
//! so the run needs working sudo before anything is downloaded.

use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::{CoreError, Result};

/// True when sudo can run without prompting for a password.
pub async fn sudo_available() -> bool {
  let status = Command::new("sudo")
    .args(["-n", "true"])
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .status()
    .await;

  match status {
    Ok(status) => status.success(),
    Err(err) => {
      debug!(error = %err, "sudo probe failed");
      false
    }
  }
}

/// Interactively refresh sudo credentials (`sudo -v`), inheriting the
/// terminal for the password prompt.
pub async fn prompt_sudo() -> Result<()> {
  let status = Command::new("sudo").arg("-v").status().await?;
  if status.success() {
    Ok(())
  } else {
    Err(CoreError::PrivilegeRequired)
  }
}
