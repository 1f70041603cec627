//! Containerized builder invocation.
//!
//! The heavy lifting (partitioning, image composition) is delegated to
//! packer-builder-arm running under podman; this module composes its
//! parameter contract and supervises the child processes.

use std::path::Path;

use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::config::{BuildConfig, Derived};
use crate::workdir;
use crate::{CoreError, Result};

/// Pull the builder container image.
pub async fn pull_builder_image(cfg: &BuildConfig) -> Result<()> {
  info!(image = %cfg.builder_image, "pulling builder image");

  let mut cmd = Command::new("podman");
  cmd.args(["pull", &cfg.builder_image]);
  run_to_completion(cmd, "podman pull").await
}

/// Run the containerized build to completion.
///
/// The container runs privileged with `/dev` and the working directory
/// mounted, and receives the entire resolved configuration through
/// `-var` parameters.
pub async fn run_build(
  cfg: &BuildConfig,
  derived: &Derived,
  packer_file: &Path,
  source_image: &Path,
  checksum: &str,
) -> Result<()> {
  let vars = builder_vars(cfg, derived, packer_file, source_image, checksum)?;
  let workdir_mount = format!("{}:/build", std::env::current_dir()?.display());

  let mut cmd = Command::new("sudo");
  cmd
    .args(["podman", "run", "--rm", "--privileged", "--pid=host"])
    .args(["-v", "/dev:/dev"])
    .args(["-v", &workdir_mount])
    .arg(&cfg.builder_image)
    .arg("build")
    .args(&vars);

  if cfg.verbose {
    info!(vars = ?vars, "running builder");
  }

  run_to_completion(cmd, "podman run").await
}

/// Compose the `-var` parameter set for the builder, ending with the
/// packer definition file. The credential list crosses the boundary as a
/// JSON array.
fn builder_vars(
  cfg: &BuildConfig,
  derived: &Derived,
  packer_file: &Path,
  source_image: &Path,
  checksum: &str,
) -> Result<Vec<String>> {
  let networks = serde_json::to_string(&cfg.networks)?;

  let subdir = workdir::build_subdir(cfg, derived);
  let subdir_name = subdir
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| subdir.display().to_string());

  let mut vars = Vec::new();
  for (key, value) in [
    ("NAME", cfg.name.clone()),
    ("VERSION", derived.version.clone()),
    ("SKIP_COMPRESSION", cfg.skip_compression.to_string()),
    ("OPENCR_MODEL", derived.opencr_model.clone()),
    ("TURTLEBOT3_MODEL", derived.robot_model.clone()),
    ("ADD_CONNECTION", derived.add_connection.to_string()),
    ("NETWORKS", networks),
    ("USERNAME", cfg.username.clone()),
    ("USER_PASSWORD", cfg.user_password.clone()),
    ("LIDAR", cfg.lidar.clone()),
    ("BUILD_SUBDIR", subdir_name),
    ("SOURCE_IMAGE_PATH", source_image.display().to_string()),
    ("IMAGE_CHECKSUM", checksum.to_string()),
    ("IMAGE_SIZE", cfg.image_size.clone()),
    ("BOOT_SIZE", cfg.boot_size.clone()),
  ] {
    vars.push("-var".to_string());
    vars.push(format!("{key}={value}"));
  }
  vars.push(packer_file.display().to_string());

  Ok(vars)
}

/// Run a child process to completion, translating interactive
/// cancellation into termination of the child.
///
/// On Ctrl-C the child is sent SIGTERM (Unix) and awaited before the
/// interruption is surfaced, so no orphan keeps mutating the build tree.
async fn run_to_completion(mut cmd: Command, tool: &str) -> Result<()> {
  debug!(tool = %tool, "spawning");
  let mut child = cmd.spawn()?;

  tokio::select! {
    status = child.wait() => {
      let status = status?;
      if status.success() {
        Ok(())
      } else {
        Err(CoreError::ExternalTool {
          tool: tool.to_string(),
          code: status.code(),
        })
      }
    }
    _ = tokio::signal::ctrl_c() => {
      info!(tool = %tool, "interrupted, terminating child");
      terminate(&mut child).await;
      Err(CoreError::Interrupted)
    }
  }
}

#[cfg(unix)]
async fn terminate(child: &mut Child) {
  use rustix::process::{Pid, Signal, kill_process};

  if let Some(pid) = child.id().and_then(|id| Pid::from_raw(id as i32)) {
    let _ = kill_process(pid, Signal::TERM);
  }
  let _ = child.wait().await;
}

#[cfg(not(unix))]
async fn terminate(child: &mut Child) {
  let _ = child.kill().await;
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::NetworkCredential;
  use std::path::PathBuf;

  fn resolved() -> (BuildConfig, Derived) {
    let cfg = BuildConfig::default();
    let derived = Derived {
      version: "1.0.0".to_string(),
      opencr_model: "burger".to_string(),
      robot_model: "burger".to_string(),
      add_connection: false,
    };
    (cfg, derived)
  }

  #[test]
  fn vars_cover_the_full_contract() {
    let (cfg, derived) = resolved();
    let vars = builder_vars(
      &cfg,
      &derived,
      Path::new("packer_ubuntu_server_2204.json"),
      Path::new(".cache/base.img.xz"),
      "cafebabe",
    )
    .unwrap();

    for key in [
      "NAME=tb3",
      "VERSION=1.0.0",
      "SKIP_COMPRESSION=false",
      "OPENCR_MODEL=burger",
      "TURTLEBOT3_MODEL=burger",
      "ADD_CONNECTION=false",
      "NETWORKS=[]",
      "USERNAME=robot",
      "USER_PASSWORD=turtlebot3",
      "LIDAR=LDS-02",
      "BUILD_SUBDIR=tb3-burger-1.0.0",
      "SOURCE_IMAGE_PATH=.cache/base.img.xz",
      "IMAGE_CHECKSUM=cafebabe",
      "IMAGE_SIZE=10G",
      "BOOT_SIZE=256M",
    ] {
      assert!(vars.iter().any(|v| v == key), "missing {key}");
    }

    assert_eq!(vars.iter().filter(|v| *v == "-var").count(), 15);
    assert_eq!(vars.last().unwrap(), "packer_ubuntu_server_2204.json");
  }

  #[test]
  fn networks_serialize_as_json() {
    let (mut cfg, derived) = resolved();
    cfg.networks.push(NetworkCredential {
      ssid: "home".to_string(),
      password: "hunter2".to_string(),
    });

    let vars = builder_vars(
      &cfg,
      &derived,
      Path::new("p.json"),
      Path::new("img"),
      "",
    )
    .unwrap();

    assert!(
      vars
        .iter()
        .any(|v| v == r#"NETWORKS=[{"ssid":"home","password":"hunter2"}]"#)
    );
  }

  #[test]
  fn build_subdir_passes_only_the_leaf() {
    let (mut cfg, derived) = resolved();
    cfg.output_directory = PathBuf::from("/tmp/deep/output");

    let vars =
      builder_vars(&cfg, &derived, Path::new("p.json"), Path::new("img"), "").unwrap();
    assert!(vars.iter().any(|v| v == "BUILD_SUBDIR=tb3-burger-1.0.0"));
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn successful_child_is_ok() {
    let mut cmd = Command::new("true");
    cmd.stdout(std::process::Stdio::null());
    run_to_completion(cmd, "true").await.unwrap();
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn failing_child_carries_exit_code() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "exit 3"]);
    let err = run_to_completion(cmd, "sh").await.unwrap_err();
    assert!(matches!(
      err,
      CoreError::ExternalTool { code: Some(3), .. }
    ));
  }
}
