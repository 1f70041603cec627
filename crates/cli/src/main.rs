//! tb3img: TurtleBot3 OS image build orchestrator.
//!
//! Loads a declarative TOML build configuration, fetches and
//! checksum-verifies the base Ubuntu image, and drives packer-builder-arm
//! inside a podman container.
//!
//! # Usage
//!
//! ```bash
//! # Build from a config file
//! tb3img --config configs/example.toml
//!
//! # Validate and display the configuration only
//! tb3img --config configs/example.toml --dry-run
//!
//! # Build without the confirmation prompt
//! tb3img --config configs/example.toml -y
//! ```
//!
//! The `[network]` section of the configuration is optional; when present
//! with an SSID, the network connection is baked into the image.

mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Build custom TurtleBot3 Ubuntu images from a TOML configuration.
#[derive(Parser)]
#[command(name = "tb3img", version, about, long_about = None)]
struct Cli {
  /// Path to the TOML configuration file
  #[arg(short, long)]
  config: PathBuf,

  /// Path to the packer builder definition
  #[arg(short, long, default_value = "packer_ubuntu_server_2204.json")]
  packer_file: PathBuf,

  /// Show the resolved configuration without running the build
  #[arg(short, long)]
  dry_run: bool,

  /// Enable verbose output
  #[arg(short, long)]
  verbose: bool,

  /// Skip the confirmation prompt
  #[arg(short = 'y', long)]
  yes: bool,
}

fn main() {
  let cli = Cli::parse();

  let default_filter = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
    )
    .without_time()
    .with_writer(std::io::stderr)
    .init();

  let options = cmd::BuildOptions {
    config: cli.config,
    packer_file: cli.packer_file,
    dry_run: cli.dry_run,
    verbose: cli.verbose,
    yes: cli.yes,
  };

  if let Err(err) = cmd::cmd_build(&options) {
    output::print_error(&format!("{err:#}"));
    std::process::exit(1);
  }
}
