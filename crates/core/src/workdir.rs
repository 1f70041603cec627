//! Per-run build directory: naming, creation, and the persisted
//! configuration snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::config::{BuildConfig, Derived, NetworkCredential};
use crate::{CoreError, Result};

/// Filename of the persisted configuration snapshot.
pub const SNAPSHOT_FILE: &str = "build_config.toml";

/// Build subdirectory for a resolved configuration:
/// `<output_directory>/<name>-<robot_model>-<version>`.
pub fn build_subdir(cfg: &BuildConfig, derived: &Derived) -> PathBuf {
  cfg.output_directory.join(format!(
    "{}-{}-{}",
    cfg.name, derived.robot_model, derived.version
  ))
}

/// Create the build subdirectory, persist the resolved snapshot into it,
/// and copy the original configuration file alongside.
pub fn prepare(cfg: &BuildConfig, derived: &Derived, config_path: &Path) -> Result<PathBuf> {
  let dir = build_subdir(cfg, derived);
  fs::create_dir_all(&dir)?;
  info!(dir = %dir.display(), "build directory ready");

  let snapshot = dir.join(SNAPSHOT_FILE);
  fs::write(&snapshot, snapshot_toml(cfg, derived)?)?;
  info!(path = %snapshot.display(), "configuration saved");

  if let Some(name) = config_path.file_name() {
    fs::copy(config_path, dir.join(name))?;
  }

  Ok(dir)
}

/// Abort if a finished image for this name/model/version already exists
/// in the build subdirectory.
pub fn check_output_collision(cfg: &BuildConfig, derived: &Derived) -> Result<()> {
  let dir = build_subdir(cfg, derived);
  if !dir.exists() {
    return Ok(());
  }

  // Matches `<name>-<robot_model>-image-<version>.img` and any
  // compressed variant (`.img.xz`, ...).
  let prefix = format!(
    "{}-{}-image-{}.img",
    cfg.name, derived.robot_model, derived.version
  );

  for entry in fs::read_dir(&dir)? {
    let entry = entry?;
    if entry.file_name().to_string_lossy().starts_with(&prefix) {
      return Err(CoreError::OutputExists(entry.path()));
    }
  }

  Ok(())
}

/// Serialize the fully resolved configuration, including the computed
/// values, as the canonical TOML snapshot.
fn snapshot_toml(cfg: &BuildConfig, derived: &Derived) -> Result<String> {
  let snapshot = Snapshot {
    network: &cfg.networks,
    image: SnapImage {
      name: &cfg.name,
      version: cfg.version.as_deref(),
      output_directory: &cfg.output_directory,
      size: SnapImageSize {
        total: &cfg.image_size,
        boot_partition: &cfg.boot_size,
      },
    },
    model: SnapModel {
      r#type: &cfg.model_type,
    },
    build: SnapBuild {
      skip_compression: cfg.skip_compression,
    },
    user: SnapUser {
      username: &cfg.username,
      password: &cfg.user_password,
    },
    lidar: SnapLidar { model: &cfg.lidar },
    source: SnapSource {
      url: &cfg.source_url,
      checksum_url: &cfg.checksum_url,
    },
    advanced: SnapAdvanced {
      packer_builder_image: &cfg.builder_image,
      verbose: cfg.verbose,
    },
    computed: derived,
  };

  toml::to_string_pretty(&snapshot)
    .map_err(|e| CoreError::Config(format!("failed to serialize configuration: {e}")))
}

#[derive(Serialize)]
struct Snapshot<'a> {
  // An empty credential list serializes as a plain value, so it has to
  // precede the top-level tables.
  network: &'a [NetworkCredential],
  image: SnapImage<'a>,
  model: SnapModel<'a>,
  build: SnapBuild,
  user: SnapUser<'a>,
  lidar: SnapLidar<'a>,
  source: SnapSource<'a>,
  advanced: SnapAdvanced<'a>,
  computed: &'a Derived,
}

#[derive(Serialize)]
struct SnapImage<'a> {
  name: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  version: Option<&'a str>,
  output_directory: &'a Path,
  size: SnapImageSize<'a>,
}

#[derive(Serialize)]
struct SnapImageSize<'a> {
  total: &'a str,
  boot_partition: &'a str,
}

#[derive(Serialize)]
struct SnapModel<'a> {
  r#type: &'a str,
}

#[derive(Serialize)]
struct SnapBuild {
  skip_compression: bool,
}

#[derive(Serialize)]
struct SnapUser<'a> {
  username: &'a str,
  password: &'a str,
}

#[derive(Serialize)]
struct SnapLidar<'a> {
  model: &'a str,
}

#[derive(Serialize)]
struct SnapSource<'a> {
  url: &'a str,
  checksum_url: &'a str,
}

#[derive(Serialize)]
struct SnapAdvanced<'a> {
  packer_builder_image: &'a str,
  verbose: bool,
}
