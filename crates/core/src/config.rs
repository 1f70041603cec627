//! Build configuration: loading, validation, and derived values.
//!
//! A configuration is assembled in three steps: a sparse TOML overlay is
//! merged onto documented defaults, the merged value is validated against
//! the fixed model and lidar sets, and derived values are computed once
//! from the validated result.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::version;
use crate::{CoreError, Result};

/// Allowed values for `[model] type`.
pub const MODEL_TYPES: &[&str] = &["burger", "waffle"];

/// Allowed values for `[lidar] model`.
pub const LIDAR_MODELS: &[&str] = &["LDS-01", "LDS-02", "LDS-03"];

/// A single WiFi credential.
///
/// SSID uniqueness is not enforced; order is preserved as written in the
/// configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkCredential {
  pub ssid: String,
  #[serde(default)]
  pub password: String,
}

/// Values computed once from a validated configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derived {
  /// Resolved version string; never empty.
  pub version: String,
  /// Identifier passed to the builder to select OpenCR provisioning.
  pub opencr_model: String,
  /// Identifier passed to the builder to select the robot model.
  pub robot_model: String,
  /// Whether network setup is baked into the image.
  pub add_connection: bool,
}

/// A fully populated build configuration.
///
/// Every field holds either an explicit value from the configuration file
/// or its documented default.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
  pub name: String,
  pub version: Option<String>,
  pub output_directory: PathBuf,
  pub model_type: String,
  pub skip_compression: bool,
  pub networks: Vec<NetworkCredential>,
  pub username: String,
  pub user_password: String,
  pub lidar: String,
  pub source_url: String,
  pub checksum_url: String,
  pub image_size: String,
  pub boot_size: String,
  pub builder_image: String,
  pub verbose: bool,
  /// True when the file carried a `[network]` section at all, even one
  /// that produced no credentials. Drives the interactive SSID fallback.
  pub network_section_present: bool,
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      name: "tb3".to_string(),
      version: None,
      output_directory: PathBuf::from("build"),
      model_type: "burger".to_string(),
      skip_compression: false,
      networks: Vec::new(),
      username: "robot".to_string(),
      user_password: "turtlebot3".to_string(),
      lidar: "LDS-02".to_string(),
      source_url: "https://cdimage.ubuntu.com/releases/22.04.5/release/ubuntu-22.04.5-preinstalled-server-arm64+raspi.img.xz".to_string(),
      checksum_url: "https://cdimage.ubuntu.com/releases/22.04.5/release/SHA256SUMS".to_string(),
      image_size: "10G".to_string(),
      boot_size: "256M".to_string(),
      builder_image: "docker.io/mkaczanowski/packer-builder-arm:latest".to_string(),
      verbose: false,
      network_section_present: false,
    }
  }
}

impl BuildConfig {
  /// Load a configuration file and merge it onto the defaults.
  pub fn load(path: &Path) -> Result<Self> {
    if !path.exists() {
      return Err(CoreError::Config(format!(
        "configuration file not found: {}",
        path.display()
      )));
    }

    let text = fs::read_to_string(path)?;
    let raw: RawConfig = toml::from_str(&text).map_err(|e| {
      CoreError::Config(format!("failed to parse {}: {e}", path.display()))
    })?;

    Ok(Self::merge(raw))
  }

  /// Overlay a sparse configuration onto the defaults.
  fn merge(raw: RawConfig) -> Self {
    let mut cfg = Self::default();

    if let Some(image) = raw.image {
      if let Some(name) = image.name {
        cfg.name = name;
      }
      cfg.version = image.version;
      if let Some(dir) = image.output_directory {
        cfg.output_directory = dir;
      }
      if let Some(size) = image.size {
        if let Some(total) = size.total {
          cfg.image_size = total;
        }
        if let Some(boot) = size.boot_partition {
          cfg.boot_size = boot;
        }
      }
    }

    if let Some(model) = raw.model {
      if let Some(kind) = model.r#type {
        cfg.model_type = kind;
      }
    }

    if let Some(build) = raw.build {
      if let Some(skip) = build.skip_compression {
        cfg.skip_compression = skip;
      }
    }

    if let Some(network) = raw.network {
      cfg.network_section_present = true;
      // Entries without an SSID are dropped; a missing password becomes
      // the empty string.
      cfg.networks = network
        .into_vec()
        .into_iter()
        .filter_map(|entry| {
          let ssid = entry.ssid.filter(|s| !s.is_empty())?;
          Some(NetworkCredential {
            ssid,
            password: entry.password.unwrap_or_default(),
          })
        })
        .collect();
    }

    if let Some(user) = raw.user {
      if let Some(username) = user.username {
        cfg.username = username;
      }
      if let Some(password) = user.password {
        cfg.user_password = password;
      }
    }

    if let Some(lidar) = raw.lidar {
      if let Some(model) = lidar.model {
        cfg.lidar = model;
      }
    }

    if let Some(source) = raw.source {
      if let Some(url) = source.url {
        cfg.source_url = url;
      }
      if let Some(url) = source.checksum_url {
        cfg.checksum_url = url;
      }
    }

    if let Some(advanced) = raw.advanced {
      if let Some(image) = advanced.packer_builder_image {
        cfg.builder_image = image;
      }
      if let Some(verbose) = advanced.verbose {
        cfg.verbose = verbose;
      }
    }

    cfg
  }

  /// Check enum-like fields against their fixed sets. Pure; no side
  /// effects.
  pub fn validate(&self) -> Result<()> {
    if !MODEL_TYPES.contains(&self.model_type.as_str()) {
      return Err(CoreError::Validation {
        field: "model type",
        value: self.model_type.clone(),
        allowed: MODEL_TYPES.join(", "),
      });
    }

    if !LIDAR_MODELS.contains(&self.lidar.as_str()) {
      return Err(CoreError::Validation {
        field: "lidar model",
        value: self.lidar.clone(),
        allowed: LIDAR_MODELS.join(", "),
      });
    }

    Ok(())
  }

  /// Compute the derived values for a validated configuration.
  ///
  /// The version is the explicit `[image] version` when present, else a
  /// label from the working tree's revision-control state, else the
  /// literal `unknown`. The result is never empty and this never fails.
  pub async fn resolve(&self) -> Derived {
    let version = match &self.version {
      Some(v) if !v.is_empty() => v.clone(),
      _ => version::describe_working_tree().await,
    };

    // The waffle image carries the Pi variant of the robot model; the
    // OpenCR identifier is the bare model type for both.
    let robot_model = if self.model_type == "waffle" {
      format!("{}_pi", self.model_type)
    } else {
      self.model_type.clone()
    };

    Derived {
      version,
      opencr_model: self.model_type.clone(),
      robot_model,
      add_connection: !self.networks.is_empty(),
    }
  }
}

/// Sparse overlay parsed from the TOML file.
///
/// Every section and field is optional; omitted sections fall back to the
/// defaults wholesale. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
  image: Option<RawImage>,
  model: Option<RawModel>,
  build: Option<RawBuild>,
  network: Option<OneOrMany<RawNetwork>>,
  user: Option<RawUser>,
  lidar: Option<RawLidar>,
  source: Option<RawSource>,
  advanced: Option<RawAdvanced>,
}

#[derive(Debug, Deserialize)]
struct RawImage {
  name: Option<String>,
  version: Option<String>,
  output_directory: Option<PathBuf>,
  size: Option<RawImageSize>,
}

#[derive(Debug, Deserialize)]
struct RawImageSize {
  total: Option<String>,
  boot_partition: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawModel {
  r#type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawBuild {
  skip_compression: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawNetwork {
  ssid: Option<String>,
  password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
  username: Option<String>,
  password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLidar {
  model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
  url: Option<String>,
  checksum_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAdvanced {
  packer_builder_image: Option<String>,
  verbose: Option<bool>,
}

/// `[network]` may be written as a single table or as an array of tables;
/// both normalize to the same list shape at load time.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
  One(T),
  Many(Vec<T>),
}

impl<T> OneOrMany<T> {
  fn into_vec(self) -> Vec<T> {
    match self {
      OneOrMany::One(value) => vec![value],
      OneOrMany::Many(values) => values,
    }
  }
}
