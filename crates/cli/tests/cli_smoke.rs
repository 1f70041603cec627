//! CLI smoke tests for tb3img.
//!
//! These tests exercise the configuration-facing surface end to end:
//! loading, validation, the dry-run display, and the confirmation gate.
//! Nothing here reaches the download or podman steps.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the tb3img binary.
fn tb3img_cmd() -> Command {
  cargo_bin_cmd!("tb3img")
}

/// Create a temp directory with a config file named `config.toml`.
fn temp_config(content: &str) -> TempDir {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("config.toml"), content).unwrap();
  temp
}

const MINIMAL_CONFIG: &str = r#"
[image]
name = "rover"
version = "9.9.9"
"#;

const NETWORK_LIST_CONFIG: &str = r#"
[image]
name = "rover"
version = "9.9.9"

[[network]]
ssid = "homelab"
"#;

const NETWORK_SINGLE_CONFIG: &str = r#"
[image]
name = "rover"
version = "9.9.9"

[network]
ssid = "homelab"
"#;

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  tb3img_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  tb3img_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("tb3img"));
}

// =============================================================================
// Configuration errors
// =============================================================================

#[test]
fn missing_config_fails() {
  tb3img_cmd()
    .args(["--config", "/nonexistent/config.toml"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("not found"));
}

#[test]
fn unparseable_config_fails() {
  let temp = temp_config("this is not toml {{{");

  tb3img_cmd()
    .current_dir(temp.path())
    .args(["--config", "config.toml", "--dry-run"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("failed to parse"));
}

#[test]
fn invalid_model_type_names_allowed_set() {
  let temp = temp_config("[model]\ntype = \"quadruped\"\n");

  tb3img_cmd()
    .current_dir(temp.path())
    .args(["--config", "config.toml", "--dry-run"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("burger, waffle"));
}

#[test]
fn invalid_lidar_names_allowed_set() {
  let temp = temp_config("[lidar]\nmodel = \"LDS-09\"\n");

  tb3img_cmd()
    .current_dir(temp.path())
    .args(["--config", "config.toml", "--dry-run"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("LDS-01, LDS-02, LDS-03"));
}

// =============================================================================
// Dry run
// =============================================================================

#[test]
fn dry_run_displays_resolved_configuration() {
  let temp = temp_config(MINIMAL_CONFIG);

  tb3img_cmd()
    .current_dir(temp.path())
    .args(["--config", "config.toml", "--dry-run"])
    .assert()
    .success()
    .stdout(predicate::str::contains("rover"))
    .stdout(predicate::str::contains("9.9.9"))
    .stdout(predicate::str::contains("disabled"));
}

#[test]
fn dry_run_creates_nothing() {
  let temp = temp_config(MINIMAL_CONFIG);

  tb3img_cmd()
    .current_dir(temp.path())
    .args(["--config", "config.toml", "--dry-run"])
    .assert()
    .success();

  assert!(!temp.path().join("build").exists());
  assert!(!temp.path().join(".cache").exists());
}

#[test]
fn network_single_and_list_forms_are_equivalent() {
  for config in [NETWORK_SINGLE_CONFIG, NETWORK_LIST_CONFIG] {
    let temp = temp_config(config);

    tb3img_cmd()
      .current_dir(temp.path())
      .args(["--config", "config.toml", "--dry-run"])
      .assert()
      .success()
      .stdout(predicate::str::contains("enabled"))
      .stdout(predicate::str::contains("homelab"));
  }
}

#[test]
fn empty_network_section_prompts_and_blank_skips() {
  let temp = temp_config("[network]\n");

  tb3img_cmd()
    .current_dir(temp.path())
    .args(["--config", "config.toml", "--dry-run"])
    .write_stdin("\n")
    .assert()
    .success()
    .stdout(predicate::str::contains("disabled"));
}

// =============================================================================
// Confirmation gate
// =============================================================================

#[test]
fn declined_confirmation_exits_zero_and_creates_nothing() {
  let temp = temp_config(MINIMAL_CONFIG);

  tb3img_cmd()
    .current_dir(temp.path())
    .args(["--config", "config.toml"])
    .write_stdin("n\n")
    .assert()
    .success()
    .stdout(predicate::str::contains("aborting"));

  assert!(!temp.path().join("build").exists());
}

#[test]
fn eof_on_confirmation_declines() {
  let temp = temp_config(MINIMAL_CONFIG);

  tb3img_cmd()
    .current_dir(temp.path())
    .args(["--config", "config.toml"])
    .assert()
    .success()
    .stdout(predicate::str::contains("aborting"));
}
