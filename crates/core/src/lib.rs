//! tb3img-core: build orchestration for TurtleBot3 OS images.
//!
//! This crate provides everything behind the `tb3img` CLI:
//! - `config`: loading, validating, and resolving the build configuration
//! - `fetch`: cache-aware acquisition of the base Ubuntu image
//! - `checksum` / `hash`: published-manifest verification
//! - `workdir`: per-run build directory and persisted configuration
//! - `builder`: the containerized packer-builder-arm invocation

pub mod builder;
pub mod checksum;
pub mod config;
mod error;
pub mod fetch;
pub mod hash;
pub mod privilege;
pub mod version;
pub mod workdir;

pub use config::{BuildConfig, Derived, NetworkCredential};
pub use error::CoreError;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
