//! Option resolution for a PostgreSQL part.
//!
//! Raw part options are a flat string mapping. Keys starting with
//! [`CONFIG_PREFIX`] are server directives for the local override file;
//! everything else drives the recipe itself.

use crate::config::BuildoutConfig;
use crate::error::{ProvisionError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Prefix marking server configuration directives.
pub const CONFIG_PREFIX: &str = "config.";

/// Client port used when the part does not set one.
pub const DEFAULT_PORT: &str = "5432";

/// Recipe option: directory holding the PostgreSQL binaries.
pub const OPT_BIN: &str = "bin";
/// Recipe option: data directory.
pub const OPT_PGDATA: &str = "pgdata";
/// Recipe option: directory receiving generated scripts.
pub const OPT_BIN_DIRECTORY: &str = "bin-directory";
/// Recipe option: the part's own directory.
pub const OPT_LOCATION: &str = "location";
/// Published option: same as `location`, for parts that expect a prefix.
pub const OPT_PREFIX: &str = "prefix";
/// Recipe option: unix socket directory.
pub const OPT_SOCKET_DIR: &str = "socket_dir";
/// Recipe option: server port.
pub const OPT_PORT: &str = "port";
/// Recipe option: initdb arguments, or `true`.
pub const OPT_INITDB: &str = "initdb";
/// Recipe option: newline separated commands run once after initialization.
pub const OPT_CMDS: &str = "cmds";

/// Fully resolved options of one part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    /// Part name.
    pub name: String,
    /// Data directory.
    pub pgdata: PathBuf,
    /// Directory holding the PostgreSQL binaries.
    pub pg_bin_dir: PathBuf,
    /// Directory receiving generated scripts.
    pub bin_dir: PathBuf,
    /// The part's own directory.
    pub location: PathBuf,
    /// Unix socket directory, exported as `PGHOST` to clients.
    pub socket_dir: String,
    /// Port exported as `PGPORT` to clients.
    pub port: String,
    /// Arguments passed to `initdb`, if initialization is wanted.
    pub initdb: Option<String>,
    /// Commands run once after a fresh initialization.
    pub cmds: Vec<String>,
    /// Server directives without the prefix, sorted by key.
    pub server_config: BTreeMap<String, String>,
    /// Generated wrapper scripts keyed by command name.
    pub scripts: BTreeMap<String, PathBuf>,
}

impl ResolvedOptions {
    /// Resolves raw part options against the build-wide defaults.
    ///
    /// Fails before touching anything when `pgdata` or `bin` is missing.
    pub fn resolve(
        name: &str,
        raw: &BTreeMap<String, String>,
        buildout: &BuildoutConfig,
    ) -> Result<Self> {
        let pgdata = required(name, raw, OPT_PGDATA)?;
        let pg_bin_dir = required(name, raw, OPT_BIN)?;

        let bin_dir = raw
            .get(OPT_BIN_DIRECTORY)
            .cloned()
            .unwrap_or_else(|| buildout.bin_directory().to_string());
        let location = raw
            .get(OPT_LOCATION)
            .map(PathBuf::from)
            .unwrap_or_else(|| Path::new(buildout.parts_directory()).join(name));
        let socket_dir = raw
            .get(OPT_SOCKET_DIR)
            .cloned()
            .unwrap_or_else(|| pgdata.clone());

        let mut server_config: BTreeMap<String, String> = raw
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(CONFIG_PREFIX)
                    .map(|bare| (bare.to_string(), value.clone()))
            })
            .collect();
        server_config
            .entry("unix_socket_directories".to_string())
            .or_insert_with(|| format!("'{}'", socket_dir));
        server_config
            .entry("unix_socket_permissions".to_string())
            .or_insert_with(|| "0700".to_string());
        server_config
            .entry("listen_addresses".to_string())
            .or_insert_with(|| "''".to_string());

        // An explicit port goes to the server; otherwise the compiled-in
        // default stays authoritative and 5432 is only assumed by clients.
        let port = match raw.get(OPT_PORT) {
            Some(port) => {
                server_config.insert("port".to_string(), port.clone());
                port.clone()
            }
            None => DEFAULT_PORT.to_string(),
        };

        let initdb = raw
            .get(OPT_INITDB)
            .map(|value| expand_initdb(value, &pgdata))
            .filter(|value| !value.trim().is_empty());

        let cmds = raw
            .get(OPT_CMDS)
            .map(|value| parse_cmds(value))
            .unwrap_or_default();

        Ok(Self {
            name: name.to_string(),
            pgdata: PathBuf::from(pgdata),
            pg_bin_dir: PathBuf::from(pg_bin_dir),
            bin_dir: PathBuf::from(bin_dir),
            location,
            socket_dir,
            port,
            initdb,
            cmds,
            server_config,
            scripts: BTreeMap::new(),
        })
    }

    /// Environment for server-side binaries.
    pub fn server_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("PGDATA".to_string(), self.pgdata.display().to_string());
        env
    }

    /// Environment for client binaries.
    pub fn client_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("PGHOST".to_string(), self.socket_dir.clone());
        env.insert("PGPORT".to_string(), self.port.clone());
        env
    }

    /// Path of the wrapper script for `command`.
    ///
    /// Falls back to the conventional location in the bin directory when the
    /// script was not generated in this run (e.g. during uninstall).
    pub fn script_path(&self, command: &str) -> PathBuf {
        self.scripts
            .get(command)
            .cloned()
            .unwrap_or_else(|| self.bin_dir.join(command))
    }

    /// Path of a binary in the PostgreSQL bin directory.
    pub fn pg_binary(&self, name: &str) -> PathBuf {
        self.pg_bin_dir.join(name)
    }

    /// Prefixes a shell command line with the PostgreSQL bin directory.
    ///
    /// `createdb app` becomes `/opt/pg/bin/createdb app`; the rest of the
    /// line is left for the shell.
    pub fn pg_command(&self, line: &str) -> String {
        format!(
            "{}/{}",
            shell_words::quote(&self.pg_bin_dir.display().to_string()),
            line
        )
    }

    /// Renders the complete resolved option mapping.
    ///
    /// This is what sibling parts see: recipe options with their defaults,
    /// prefixed server directives and one entry per generated script.
    pub fn to_options(&self) -> BTreeMap<String, String> {
        let mut options = BTreeMap::new();
        options.insert(OPT_BIN.to_string(), self.pg_bin_dir.display().to_string());
        options.insert(OPT_PGDATA.to_string(), self.pgdata.display().to_string());
        options.insert(
            OPT_BIN_DIRECTORY.to_string(),
            self.bin_dir.display().to_string(),
        );
        options.insert(OPT_LOCATION.to_string(), self.location.display().to_string());
        options.insert(OPT_PREFIX.to_string(), self.location.display().to_string());
        options.insert(OPT_SOCKET_DIR.to_string(), self.socket_dir.clone());
        options.insert(OPT_PORT.to_string(), self.port.clone());
        if let Some(initdb) = &self.initdb {
            options.insert(OPT_INITDB.to_string(), initdb.clone());
        }
        if !self.cmds.is_empty() {
            options.insert(OPT_CMDS.to_string(), self.cmds.join("\n"));
        }
        for (key, value) in &self.server_config {
            options.insert(format!("{}{}", CONFIG_PREFIX, key), value.clone());
        }
        for (command, path) in &self.scripts {
            options.insert(command.clone(), path.display().to_string());
        }
        options
    }
}

fn required(part: &str, raw: &BTreeMap<String, String>, key: &str) -> Result<String> {
    raw.get(key)
        .cloned()
        .ok_or_else(|| ProvisionError::missing_option(part, key))
}

/// Expands `initdb = true` into the default trust-auth arguments.
///
/// The result is a shell argument string, so `pgdata` is quoted.
pub fn expand_initdb(value: &str, pgdata: &str) -> String {
    if value.eq_ignore_ascii_case("true") {
        format!("--auth-local=trust --pgdata={}", shell_words::quote(pgdata))
    } else {
        value.to_string()
    }
}

fn parse_cmds(value: &str) -> Vec<String> {
    value
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
