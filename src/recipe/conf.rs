//! Server configuration merging.
//!
//! `postgresql.conf` is left as initdb wrote it except for a single include
//! line; everything this tool manages lives in `postgresql.local.conf`, which
//! is regenerated from scratch on every run.

use crate::error::{ProvisionError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Main server configuration file name.
pub const MAIN_CONF_FILENAME: &str = "postgresql.conf";

/// Generated override file name.
pub const LOCAL_CONF_FILENAME: &str = "postgresql.local.conf";

/// Include directive pulling the override file into the main one.
pub const INCLUDE_LOCAL_CONF: &str = "include = 'postgresql.local.conf'";

/// Returns true when some line of `conf` starts with the include directive.
pub fn has_include(conf: &str) -> bool {
    conf.lines().any(|line| line.starts_with(INCLUDE_LOCAL_CONF))
}

/// Renders server directives as `key = value` lines, sorted by key.
pub fn render_local_conf(server_config: &BTreeMap<String, String>) -> String {
    server_config
        .iter()
        .map(|(key, value)| format!("{} = {}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ensures the include line is present and rewrites the override file.
///
/// The main configuration file must already exist; initdb creates it.
pub fn configure(conf_dir: &Path, server_config: &BTreeMap<String, String>) -> Result<()> {
    let conf_file = conf_dir.join(MAIN_CONF_FILENAME);
    let mut conf =
        fs::read_to_string(&conf_file).map_err(|e| ProvisionError::filesystem(&conf_file, e))?;

    if !has_include(&conf) {
        info!("Including local configuration");
        conf.push_str("\n\n");
        conf.push_str(INCLUDE_LOCAL_CONF);
        conf.push('\n');
        fs::write(&conf_file, conf).map_err(|e| ProvisionError::filesystem(&conf_file, e))?;
    }

    let local_conf_file = conf_dir.join(LOCAL_CONF_FILENAME);
    info!("Writing local configuration");
    fs::write(&local_conf_file, render_local_conf(server_config))
        .map_err(|e| ProvisionError::filesystem(&local_conf_file, e))?;

    Ok(())
}
