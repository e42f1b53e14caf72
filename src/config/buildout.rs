//! Build-wide defaults and part option values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default directory for generated scripts.
pub const DEFAULT_BIN_DIRECTORY: &str = "bin";

/// Default directory under which each part gets its location.
pub const DEFAULT_PARTS_DIRECTORY: &str = "parts";

/// The `buildout` section: defaults shared by every part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildoutConfig {
    /// Directory that receives generated scripts.
    pub bin_directory: Option<String>,

    /// Directory under which part locations are created.
    pub parts_directory: Option<String>,
}

impl BuildoutConfig {
    /// Returns the configured bin directory or the default.
    pub fn bin_directory(&self) -> &str {
        self.bin_directory
            .as_deref()
            .unwrap_or(DEFAULT_BIN_DIRECTORY)
    }

    /// Returns the configured parts directory or the default.
    pub fn parts_directory(&self) -> &str {
        self.parts_directory
            .as_deref()
            .unwrap_or(DEFAULT_PARTS_DIRECTORY)
    }
}

/// A single part option value.
///
/// YAML scalars of any type are accepted and kept in their string form, so
/// `port: 5433` and `port: "5433"` are equivalent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "serde_yaml::Value", into = "String")]
pub struct OptionValue(String);

impl OptionValue {
    /// Returns the value as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<serde_yaml::Value> for OptionValue {
    type Error = String;

    fn try_from(value: serde_yaml::Value) -> Result<Self, Self::Error> {
        match value {
            serde_yaml::Value::String(s) => Ok(OptionValue(s)),
            serde_yaml::Value::Number(n) => Ok(OptionValue(n.to_string())),
            serde_yaml::Value::Bool(b) => Ok(OptionValue(b.to_string())),
            serde_yaml::Value::Null => Ok(OptionValue(String::new())),
            other => Err(format!(
                "option values must be scalars, got {}",
                describe(&other)
            )),
        }
    }
}

impl From<OptionValue> for String {
    fn from(value: OptionValue) -> Self {
        value.0
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue(value.to_string())
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn describe(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
        _ => "a scalar",
    }
}
