//! pgprovision - Local PostgreSQL provisioning
//!
//! This crate provisions and manages a local PostgreSQL instance as one step
//! of an automated environment build.
//!
//! # Overview
//!
//! Each named part of the build configuration describes one instance: where
//! the PostgreSQL binaries live, where the data directory goes, and which
//! server settings to apply. Installing a part writes wrapper scripts,
//! initializes the data directory on first run, merges the server
//! configuration, runs one-time commands against a temporarily started
//! server and stops it again. Later runs only refresh scripts and
//! configuration.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface definitions
//! - [`config`] - Configuration file parsing and validation
//! - [`error`] - Error types and error handling
//! - [`process`] - External program execution
//! - [`recipe`] - Option resolution, scripts, configuration and lifecycle

pub mod cli;
pub mod config;
pub mod error;
pub mod process;
pub mod recipe;

// Re-exports for convenience
pub use cli::Cli;
pub use config::Config;
pub use error::{ErrorCode, ProvisionError, Result};
pub use process::{CommandRunner, ExecRunner};
pub use recipe::{uninstall, Recipe, ResolvedOptions};
