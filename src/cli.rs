//! Command-line interface definition for pgprovision.
//!
//! This module defines the CLI structure using clap derive macros,
//! including all subcommands and their arguments.

use crate::config::LogLevel;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// pgprovision - Local PostgreSQL provisioning
///
/// Creates, configures and initializes a local PostgreSQL instance for each
/// part defined in the build configuration.
#[derive(Debug, Parser)]
#[command(name = "pgprovision")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "PGPROVISION_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Returns the log level requested on the command line, if any.
    pub fn log_level(&self) -> Option<LogLevel> {
        if self.quiet {
            return Some(LogLevel::Error);
        }

        match self.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Provision a part: initialize on first run, reconfigure afterwards
    Install(PartArgs),

    /// Same as install
    Update(PartArgs),

    /// Stop a part's server if it is running
    Uninstall(PartArgs),

    /// Configuration file operations
    #[command(subcommand)]
    Config(ConfigCommands),
}

impl Commands {
    /// Returns the part named by the command, if any.
    pub fn part(&self) -> Option<&str> {
        match self {
            Commands::Install(args) | Commands::Update(args) | Commands::Uninstall(args) => {
                Some(args.part.as_str())
            }
            Commands::Config(ConfigCommands::Show(args)) => Some(args.part.as_str()),
            Commands::Config(ConfigCommands::Validate) => None,
        }
    }
}

/// Arguments naming a single part.
#[derive(Debug, Args)]
pub struct PartArgs {
    /// Part name in the configuration file
    pub part: String,
}

/// Configuration subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Validate the configuration file and every part in it
    Validate,

    /// Show the resolved options of a part
    Show(ShowArgs),
}

/// Arguments for `config show`.
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Part name in the configuration file
    pub part: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

/// Output format for `config show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML mapping
    Yaml,
    /// JSON object
    Json,
}
