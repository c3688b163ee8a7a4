//! Core types and configuration for appship.
//!
//! This crate defines the `appship.toml` schema ([`AppshipConfig`]), App Engine
//! manifest discovery and rewriting ([`manifest`]), environment-variable
//! merging ([`envvars`]), flag tokenizing ([`flags`]), and shared error types.

pub mod config;
pub mod envvars;
pub mod error;
pub mod flags;
pub mod manifest;

pub use config::{
    AppshipConfig, DeployConfig, GcloudConfig, OutputFormat, ParseMode, ReleaseChannel,
};
pub use envvars::EnvVarBlock;
pub use error::{Error, ErrorKind, Result};
pub use manifest::{Manifest, ManifestGuard};
