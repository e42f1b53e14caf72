//! Recipe module - lifecycle of one PostgreSQL part.
//!
//! A [`Recipe`] owns the resolved options of a part and drives it through
//! initialization, configuration, a temporary start for the one-time
//! commands, and stop. Re-running it against an existing data directory only
//! refreshes scripts and configuration.

pub mod conf;
pub mod options;
pub mod scripts;


use crate::config::BuildoutConfig;
use crate::error::{ProvisionError, Result};
use crate::process::{CommandRunner, Invocation};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, Instrument, Span};

pub use options::ResolvedOptions;

/// File whose presence in the data directory means the server was started.
pub const PID_FILENAME: &str = "postmaster.pid";

/// Number of readiness probes after issuing a start.
pub const READINESS_ATTEMPTS: u32 = 10;

/// Delay between two readiness probes.
pub const READINESS_INTERVAL: Duration = Duration::from_secs(1);

/// Delay after a stop, letting the server release its socket and lock files.
pub const STOP_SETTLE: Duration = Duration::from_secs(4);

/// Lifecycle controller for one part.
pub struct Recipe {
    options: ResolvedOptions,
    runner: Arc<dyn CommandRunner>,
    span: Span,
}

impl Recipe {
    /// Resolves the part's options and creates the controller.
    ///
    /// Nothing is written or executed here; a missing required option fails
    /// immediately.
    pub fn new(
        name: &str,
        raw: &BTreeMap<String, String>,
        buildout: &BuildoutConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self> {
        let options = ResolvedOptions::resolve(name, raw, buildout)?;
        let span = info_span!("part", part = %name);

        Ok(Self {
            options,
            runner,
            span,
        })
    }

    /// Returns the resolved options, including generated script paths.
    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    /// Installs or updates the part and returns its location.
    ///
    /// A fresh data directory is initialized, configured, started for the
    /// one-time commands and stopped again. An existing one is only
    /// reconfigured.
    pub async fn install(&mut self) -> Result<PathBuf> {
        let span = self.span.clone();
        async {
            scripts::create_bin_scripts(&mut self.options)?;

            let location = self.options.location.clone();
            fs::create_dir_all(&location)
                .map_err(|e| ProvisionError::filesystem(&location, e))?;

            if self.pgdata_exists() {
                info!(pgdata = %self.options.pgdata.display(), "Data directory exists, updating configuration");
                self.configure()?;
                return Ok(location);
            }

            self.initdb().await?;
            self.configure()?;
            self.startdb().await?;
            self.do_cmds().await?;
            self.stopdb().await?;

            info!(location = %location.display(), "Part installed");
            Ok(location)
        }
        .instrument(span)
        .await
    }

    /// Same as [`Recipe::install`].
    pub async fn update(&mut self) -> Result<PathBuf> {
        self.install().await
    }

    /// Returns true when the data directory exists.
    pub fn pgdata_exists(&self) -> bool {
        self.options.pgdata.exists()
    }

    /// Returns true when the server's PID file is present.
    pub fn is_db_started(&self) -> bool {
        self.options.pgdata.join(PID_FILENAME).exists()
    }

    /// Runs initdb, unless it is not configured or the data directory
    /// already exists.
    pub async fn initdb(&self) -> Result<()> {
        let Some(arguments) = &self.options.initdb else {
            debug!("No initdb arguments configured");
            return Ok(());
        };
        if self.pgdata_exists() {
            debug!("Data directory exists, skipping initdb");
            return Ok(());
        }

        info!(arguments = %arguments, "Initializing data directory");
        let line = format!("initdb {}", arguments);
        let invocation = Invocation::shell(self.options.pg_command(&line));
        self.runner
            .check(&invocation)
            .instrument(self.span.clone())
            .await
    }

    /// Includes the local configuration file and rewrites it.
    pub fn configure(&self) -> Result<()> {
        let _entered = self.span.enter();
        conf::configure(&self.options.pgdata, &self.options.server_config)
    }

    /// Starts (or restarts) the server and waits until it accepts
    /// connections.
    pub async fn startdb(&self) -> Result<()> {
        async {
            let action = if self.is_db_started() {
                "restart"
            } else {
                "start"
            };
            info!(action, "Starting server");
            let pg_ctl = Invocation::new(self.options.script_path("pg_ctl")).arg(action);
            self.runner.check(&pg_ctl).await?;

            for attempt in 1..=READINESS_ATTEMPTS {
                if self.is_db_listening().await {
                    info!(attempt, "Server is accepting connections");
                    return Ok(());
                }
                debug!(attempt, "Server not ready yet");
                if attempt < READINESS_ATTEMPTS {
                    tokio::time::sleep(READINESS_INTERVAL).await;
                }
            }

            Err(ProvisionError::StartupTimeout {
                attempts: READINESS_ATTEMPTS,
            })
        }
        .instrument(self.span.clone())
        .await
    }

    /// Stops the server if it was started.
    pub async fn stopdb(&self) -> Result<()> {
        async {
            if !self.is_db_started() {
                debug!("Server not started, nothing to stop");
                return Ok(());
            }

            info!("Stopping server");
            let pg_ctl = Invocation::new(self.options.script_path("pg_ctl")).arg("stop");
            self.runner.check(&pg_ctl).await?;
            tokio::time::sleep(STOP_SETTLE).await;
            Ok(())
        }
        .instrument(self.span.clone())
        .await
    }

    /// Probes the server once with `pg_isready`.
    pub async fn is_db_listening(&self) -> bool {
        let probe = Invocation::new(self.options.script_path("pg_isready")).quiet();
        self.runner.probe(&probe).await
    }

    /// Runs the one-time commands with the client environment.
    ///
    /// Each line is a shell command line whose first word names a binary in
    /// the PostgreSQL bin directory, so redirects, pipes and variables work.
    pub async fn do_cmds(&self) -> Result<()> {
        async {
            for cmd in &self.options.cmds {
                let env = self.options.client_env();
                info!(command = %cmd, env = ?env, "Running command");
                let invocation = Invocation::shell(self.options.pg_command(cmd)).envs(env);
                self.runner.check(&invocation).await?;
            }
            Ok(())
        }
        .instrument(self.span.clone())
        .await
    }
}

/// Stops the part's server if it is running.
///
/// Neither the data directory nor the generated scripts are removed.
pub async fn uninstall(
    name: &str,
    raw: &BTreeMap<String, String>,
    buildout: &BuildoutConfig,
    runner: Arc<dyn CommandRunner>,
) -> Result<()> {
    let recipe = Recipe::new(name, raw, buildout, runner)?;
    recipe.stopdb().await
}
