//! Error types and error handling for pgprovision.
//!
//! This module defines all error types used throughout the application,
//! including error codes and CLI exit codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes reported alongside every error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// E001: Configuration is invalid or incomplete
    #[serde(rename = "E001")]
    ConfigInvalid,

    /// E002: An external binary failed
    #[serde(rename = "E002")]
    SubprocessFailed,

    /// E003: The server never became ready
    #[serde(rename = "E003")]
    StartupTimeout,

    /// E004: A file could not be read or written
    #[serde(rename = "E004")]
    FilesystemError,
}

impl ErrorCode {
    /// Returns the error code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalid => "E001",
            ErrorCode::SubprocessFailed => "E002",
            ErrorCode::StartupTimeout => "E003",
            ErrorCode::FilesystemError => "E004",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// CLI exit codes.
pub mod exit_code {
    /// General error
    pub const GENERAL_ERROR: i32 = 1;
    /// Configuration error
    pub const CONFIG_ERROR: i32 = 2;
    /// Subprocess error
    pub const SUBPROCESS_ERROR: i32 = 3;
    /// Timeout error
    pub const TIMEOUT_ERROR: i32 = 4;
}

/// The main error type for pgprovision.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Configuration file is invalid or cannot be loaded.
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A required option is absent from a part.
    #[error("Missing option in [{part}]: {key}")]
    MissingOption { part: String, key: String },

    /// An external binary exited unsuccessfully.
    #[error("Command failed: {command} (exit code {})", display_code(.code))]
    Subprocess { command: String, code: Option<i32> },

    /// An external binary could not be executed at all.
    #[error("Failed to execute '{command}'")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The readiness probe never succeeded.
    #[error("Failed to start postgres (not ready after {attempts} attempts)")]
    StartupTimeout { attempts: u32 },

    /// A file could not be read or written.
    #[error("Filesystem error: {}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProvisionError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ProvisionError::Config { .. } | ProvisionError::MissingOption { .. } => {
                ErrorCode::ConfigInvalid
            }
            ProvisionError::Subprocess { .. } | ProvisionError::Spawn { .. } => {
                ErrorCode::SubprocessFailed
            }
            ProvisionError::StartupTimeout { .. } => ErrorCode::StartupTimeout,
            ProvisionError::Filesystem { .. } | ProvisionError::Io(_) => {
                ErrorCode::FilesystemError
            }
            ProvisionError::Yaml(_) | ProvisionError::Json(_) => ErrorCode::ConfigInvalid,
        }
    }

    /// Returns the CLI exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ProvisionError::Config { .. }
            | ProvisionError::MissingOption { .. }
            | ProvisionError::Yaml(_) => exit_code::CONFIG_ERROR,
            ProvisionError::Subprocess { .. } | ProvisionError::Spawn { .. } => {
                exit_code::SUBPROCESS_ERROR
            }
            ProvisionError::StartupTimeout { .. } => exit_code::TIMEOUT_ERROR,
            _ => exit_code::GENERAL_ERROR,
        }
    }

    /// Returns true for errors raised before any side effect took place.
    pub fn is_config_error(&self) -> bool {
        self.code() == ErrorCode::ConfigInvalid
    }

    /// Creates a configuration error with a message.
    pub fn config(message: impl Into<String>) -> Self {
        ProvisionError::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a configuration error with a message and source.
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ProvisionError::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a missing option error.
    pub fn missing_option(part: impl Into<String>, key: impl Into<String>) -> Self {
        ProvisionError::MissingOption {
            part: part.into(),
            key: key.into(),
        }
    }

    /// Creates a filesystem error for the given path.
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProvisionError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

/// Result type alias for pgprovision operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::ConfigInvalid.as_str(), "E001");
        assert_eq!(ErrorCode::SubprocessFailed.as_str(), "E002");
        assert_eq!(ErrorCode::StartupTimeout.as_str(), "E003");
        assert_eq!(ErrorCode::FilesystemError.as_str(), "E004");
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::StartupTimeout).unwrap();
        assert_eq!(json, "\"E003\"");
    }

    #[test]
    fn test_provision_error_code() {
        let err = ProvisionError::missing_option("postgres", "pgdata");
        assert_eq!(err.code(), ErrorCode::ConfigInvalid);
        assert!(err.is_config_error());

        let err = ProvisionError::Subprocess {
            command: "initdb".to_string(),
            code: Some(1),
        };
        assert_eq!(err.code(), ErrorCode::SubprocessFailed);
        assert!(!err.is_config_error());

        let err = ProvisionError::StartupTimeout { attempts: 10 };
        assert_eq!(err.code(), ErrorCode::StartupTimeout);
    }

    #[test]
    fn test_provision_error_exit_code() {
        let err = ProvisionError::config("invalid yaml");
        assert_eq!(err.exit_code(), exit_code::CONFIG_ERROR);

        let err = ProvisionError::missing_option("postgres", "bin");
        assert_eq!(err.exit_code(), exit_code::CONFIG_ERROR);

        let err = ProvisionError::StartupTimeout { attempts: 10 };
        assert_eq!(err.exit_code(), exit_code::TIMEOUT_ERROR);

        let err = ProvisionError::filesystem(
            "/data/pg/postgresql.conf",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert_eq!(err.exit_code(), exit_code::GENERAL_ERROR);
    }

    #[test]
    fn test_error_display() {
        let err = ProvisionError::missing_option("postgres", "pgdata");
        assert_eq!(format!("{}", err), "Missing option in [postgres]: pgdata");

        let err = ProvisionError::StartupTimeout { attempts: 10 };
        assert_eq!(
            format!("{}", err),
            "Failed to start postgres (not ready after 10 attempts)"
        );

        let err = ProvisionError::Subprocess {
            command: "/opt/pg/bin/initdb".to_string(),
            code: Some(2),
        };
        assert_eq!(
            format!("{}", err),
            "Command failed: /opt/pg/bin/initdb (exit code 2)"
        );

        let err = ProvisionError::Subprocess {
            command: "pg_ctl".to_string(),
            code: None,
        };
        assert_eq!(format!("{}", err), "Command failed: pg_ctl (exit code none)");
    }

    #[test]
    fn test_filesystem_error_keeps_source() {
        use std::error::Error as _;

        let err = ProvisionError::filesystem(
            "/data/pg/postgresql.conf",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(err.to_string().contains("/data/pg/postgresql.conf"));
        assert!(err.source().is_some());
    }
}
