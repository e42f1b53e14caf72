//! Configuration module for pgprovision.
//!
//! This module loads the YAML build configuration: build-wide defaults,
//! logging settings and the named parts, each of which is an option mapping
//! for one PostgreSQL instance.

mod buildout;
mod logging;

pub use buildout::{
    BuildoutConfig, OptionValue, DEFAULT_BIN_DIRECTORY, DEFAULT_PARTS_DIRECTORY,
};
pub use logging::{parse_setting, LogFormat, LogLevel, LogOutput, LoggingConfig};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::ProvisionError;

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "pgprovision.yaml";

/// Environment variable for configuration file path.
pub const ENV_CONFIG_PATH: &str = "PGPROVISION_CONFIG";

/// Raw options of one part, in file order-independent form.
pub type PartOptions = BTreeMap<String, OptionValue>;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build-wide defaults.
    pub buildout: BuildoutConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Named parts, one per managed instance.
    pub parts: BTreeMap<String, PartOptions>,
}

impl Config {
    /// Loads configuration with the following priority:
    /// 1. Explicit path (if provided)
    /// 2. PGPROVISION_CONFIG environment variable
    /// 3. pgprovision.yaml in the working directory
    ///
    /// Returns default config if no file exists and no path was given.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ProvisionError> {
        let path = Self::resolve_config_path(explicit_path);

        let mut config = if path.exists() {
            Self::load_from_path(&path)?
        } else if explicit_path.is_some() || env::var_os(ENV_CONFIG_PATH).is_some() {
            return Err(ProvisionError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        } else {
            Config::default()
        };

        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Resolves the configuration file path based on priority.
    fn resolve_config_path(explicit_path: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit_path {
            return path.to_path_buf();
        }

        if let Some(env_path) = env::var_os(ENV_CONFIG_PATH) {
            return PathBuf::from(env_path);
        }

        PathBuf::from(DEFAULT_CONFIG_PATH)
    }

    /// Loads configuration from a YAML file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ProvisionError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProvisionError::config_with_source(
                format!("Failed to read config file: {}", path.display()),
                e,
            )
        })?;

        Self::load_from_str(&content).map_err(|e| match e {
            ProvisionError::Yaml(source) => ProvisionError::config_with_source(
                format!("Failed to parse config file {}: {}", path.display(), source),
                source,
            ),
            other => other,
        })
    }

    /// Loads configuration from a YAML string.
    pub fn load_from_str(content: &str) -> Result<Self, ProvisionError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides looked up by environment variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("PGPROVISION_LOG_LEVEL") {
            if let Ok(level) = parse_setting::<LogLevel>("level", &level) {
                self.logging.level = level;
            }
        }
        if let Some(format) = lookup("PGPROVISION_LOG_FORMAT") {
            if let Ok(format) = parse_setting::<LogFormat>("format", &format) {
                self.logging.format = format;
            }
        }
        if let Some(bin_directory) = lookup("PGPROVISION_BIN_DIRECTORY") {
            self.buildout.bin_directory = Some(bin_directory);
        }
    }

    /// Validates the configuration.
    fn validate(&self) -> Result<(), ProvisionError> {
        if self.logging.output == LogOutput::File && self.logging.file_path.is_none() {
            return Err(ProvisionError::config(
                "logging.file_path is required when output is file",
            ));
        }

        for name in self.parts.keys() {
            if name.trim().is_empty() {
                return Err(ProvisionError::config("part names must not be empty"));
            }
            if name.contains('/') {
                return Err(ProvisionError::config(format!(
                    "part name '{}' must not contain '/'",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Returns the raw options of a part as plain strings.
    pub fn part(&self, name: &str) -> Result<BTreeMap<String, String>, ProvisionError> {
        let options = self
            .parts
            .get(name)
            .ok_or_else(|| ProvisionError::config(format!("Unknown part: {}", name)))?;

        Ok(options
            .iter()
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect())
    }
}
