//! Implementation of the build run.
//!
//! Drives the full state machine: load → validate → resolve → display →
//! confirm → prepare the build directory → acquire the source image →
//! pull the builder → build.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use tb3img_core::config::{BuildConfig, Derived};
use tb3img_core::{builder, fetch, privilege, workdir};

use crate::output::{self, print_info, print_stat, print_success};
use crate::prompts;

pub struct BuildOptions {
  pub config: PathBuf,
  pub packer_file: PathBuf,
  pub dry_run: bool,
  pub verbose: bool,
  pub yes: bool,
}

/// Execute a build run. Declining the confirmation and `--dry-run` both
/// return `Ok` (exit 0); every failure maps to exit 1 in `main`.
pub fn cmd_build(opts: &BuildOptions) -> Result<()> {
  let mut cfg = BuildConfig::load(&opts.config)?;
  if opts.verbose {
    cfg.verbose = true;
  }
  cfg.validate()?;

  let rt = tokio::runtime::Runtime::new().context("failed to create async runtime")?;
  let mut derived = rt.block_on(cfg.resolve());

  // Interactive fallback: a [network] section that produced no
  // credentials asks for one on the terminal.
  if cfg.network_section_present && cfg.networks.is_empty() {
    if let Some(credential) = prompts::prompt_network()? {
      cfg.networks.push(credential);
      derived.add_connection = true;
    }
  }

  display_config(&cfg, &derived);

  if opts.dry_run {
    print_info("dry run, not executing build");
    return Ok(());
  }

  if !opts.yes && !prompts::confirm("Are these settings correct?")? {
    print_info("aborting at user request");
    return Ok(());
  }

  println!();
  print_info("proceeding with the build");
  debug!(packer_file = %opts.packer_file.display(), "using packer definition");

  let build_dir = workdir::prepare(&cfg, &derived, &opts.config)?;
  workdir::check_output_collision(&cfg, &derived)?;

  rt.block_on(run_build_steps(&cfg, &derived, &opts.packer_file))?;

  print_success(&format!(
    "build complete, output in {}",
    build_dir.display()
  ));
  Ok(())
}

async fn run_build_steps(
  cfg: &BuildConfig,
  derived: &Derived,
  packer_file: &Path,
) -> Result<()> {
  if !privilege::sudo_available().await {
    print_info("sudo permissions are required for this build");
    privilege::prompt_sudo().await?;
  }

  let image = fetch::acquire(
    &cfg.source_url,
    &cfg.checksum_url,
    Path::new(fetch::CACHE_DIR),
  )
  .await?;

  let size = std::fs::metadata(&image.path).map(|m| m.len()).unwrap_or(0);
  print_info(&format!(
    "source image ready: {} ({})",
    image.path.display(),
    output::format_bytes(size)
  ));

  builder::pull_builder_image(cfg).await?;
  builder::run_build(
    cfg,
    derived,
    packer_file,
    &image.path,
    image.digest.as_deref().unwrap_or(""),
  )
  .await?;

  Ok(())
}

fn display_config(cfg: &BuildConfig, derived: &Derived) {
  println!();
  println!("Configuration");
  println!("-------------");
  print_stat("Name", &cfg.name);
  print_stat("Version", &derived.version);
  print_stat("Model", &cfg.model_type);
  print_stat("Lidar", &cfg.lidar);
  print_stat("Username", &cfg.username);
  print_stat("Password", &output::mask(&cfg.user_password));
  print_stat("Skip compression", &cfg.skip_compression.to_string());
  print_stat(
    "Network setup",
    if derived.add_connection {
      "enabled"
    } else {
      "disabled"
    },
  );
  for (i, network) in cfg.networks.iter().enumerate() {
    print_stat(
      &format!("Network {}", i + 1),
      &format!("{} / {}", network.ssid, output::mask(&network.password)),
    );
  }
  print_stat(
    "Output directory",
    &cfg.output_directory.display().to_string(),
  );
  print_stat(
    "Build subdirectory",
    &workdir::build_subdir(cfg, derived).display().to_string(),
  );
  print_stat("Source", &cfg.source_url);
  print_stat(
    "Image size",
    &format!("{} ({} boot)", cfg.image_size, cfg.boot_size),
  );
  println!();
}
