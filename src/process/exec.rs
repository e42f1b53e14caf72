//! Exec runner implementation.
//!
//! This runner spawns real processes with `tokio::process` and waits for
//! them to exit. Output is not captured: `pg_ctl start` leaves a server
//! running that inherits whatever the child was given, so waiting for
//! captured pipes to close would wait for the server to stop. Child stdout
//! is sent to our stderr, keeping stdout for command results.

use crate::error::{ProvisionError, Result};
use crate::process::backend::{CommandRunner, ExitOutcome, Invocation};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Runner that executes invocations as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecRunner;

impl ExecRunner {
    /// Creates a new exec runner.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ExecRunner {
    fn name(&self) -> &'static str {
        "exec"
    }

    async fn run(&self, invocation: &Invocation) -> Result<ExitOutcome> {
        debug!(
            command = %invocation,
            env = ?invocation.env,
            "Executing command"
        );

        let (stdout, stderr) = if invocation.quiet {
            (Stdio::null(), Stdio::null())
        } else {
            (Stdio::from(std::io::stderr()), Stdio::inherit())
        };

        let status = Command::new(invocation.program())
            .args(&invocation.args)
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .status()
            .await
            .map_err(|e| ProvisionError::Spawn {
                command: invocation.to_string(),
                source: e,
            })?;

        debug!(
            program = invocation.program_name(),
            exit_code = status.code(),
            "Command completed"
        );

        Ok(ExitOutcome {
            success: status.success(),
            code: status.code(),
        })
    }
}
