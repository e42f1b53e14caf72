//! Command runner trait and common types.
//!
//! This module defines the `CommandRunner` trait through which every external
//! binary (initdb, pg_ctl, pg_isready, user commands) is invoked, along with
//! the invocation and outcome types shared by all runners.

use crate::error::{ProvisionError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A single external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute.
    pub program: PathBuf,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
    /// Environment variables added on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    /// Discard the program's output instead of passing it through.
    pub quiet: bool,
}

impl Invocation {
    /// Creates an invocation with no arguments and no extra environment.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            quiet: false,
        }
    }

    /// Runs `script` with `sh -c`.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Replaces the extra environment.
    pub fn envs(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Discards the program's output.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Returns the program's file name, used to identify the invocation in logs.
    pub fn program_name(&self) -> &str {
        self.program
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }

    /// Returns the program path.
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", shell_words::quote(arg))?;
        }
        Ok(())
    }
}

/// Outcome of a completed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Whether the program exited with status 0.
    pub success: bool,
    /// The exit code, if the program was not killed by a signal.
    pub code: Option<i32>,
}

impl ExitOutcome {
    /// Creates a successful outcome.
    pub fn success() -> Self {
        Self {
            success: true,
            code: Some(0),
        }
    }

    /// Creates a failed outcome with the given exit code.
    pub fn failure(code: i32) -> Self {
        Self {
            success: false,
            code: Some(code),
        }
    }
}

/// Trait for command runners.
///
/// Runners execute a program to completion and report its exit status.
/// They never interpret the status themselves; `check` and `probe` give the
/// two interpretations the lifecycle needs.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Returns the name of this runner.
    fn name(&self) -> &'static str;

    /// Runs the invocation to completion.
    async fn run(&self, invocation: &Invocation) -> Result<ExitOutcome>;

    /// Runs the invocation and fails unless it exits successfully.
    async fn check(&self, invocation: &Invocation) -> Result<()> {
        let outcome = self.run(invocation).await?;
        if outcome.success {
            Ok(())
        } else {
            Err(ProvisionError::Subprocess {
                command: invocation.to_string(),
                code: outcome.code,
            })
        }
    }

    /// Runs the invocation and reports success as a boolean.
    ///
    /// A program that cannot be executed counts as "not successful".
    async fn probe(&self, invocation: &Invocation) -> bool {
        match self.run(invocation).await {
            Ok(outcome) => outcome.success,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRunner(ExitOutcome);

    #[async_trait]
    impl CommandRunner for FixedRunner {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn run(&self, _invocation: &Invocation) -> Result<ExitOutcome> {
            Ok(self.0.clone())
        }
    }

    struct BrokenRunner;

    #[async_trait]
    impl CommandRunner for BrokenRunner {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn run(&self, invocation: &Invocation) -> Result<ExitOutcome> {
            Err(ProvisionError::Spawn {
                command: invocation.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }

    #[test]
    fn test_invocation_builder() {
        let mut env = BTreeMap::new();
        env.insert("PGPORT".to_string(), "5432".to_string());

        let invocation = Invocation::new("/opt/pg/bin/initdb")
            .arg("--auth-local=trust")
            .args(["--pgdata", "/data/pg"])
            .envs(env);

        assert_eq!(invocation.program_name(), "initdb");
        assert_eq!(
            invocation.args,
            vec!["--auth-local=trust", "--pgdata", "/data/pg"]
        );
        assert_eq!(invocation.env.get("PGPORT").map(String::as_str), Some("5432"));
    }

    #[test]
    fn test_shell_invocation() {
        let invocation = Invocation::shell("/opt/pg/bin/psql app < schema.sql");

        assert_eq!(invocation.program_name(), "sh");
        assert_eq!(invocation.args, vec!["-c", "/opt/pg/bin/psql app < schema.sql"]);
        assert!(!invocation.quiet);
        assert!(Invocation::new("pg_isready").quiet().quiet);
    }

    #[test]
    fn test_invocation_display_quotes_arguments() {
        let invocation = Invocation::new("/opt/pg/bin/psql").args(["-c", "select 1"]);
        assert_eq!(invocation.to_string(), "/opt/pg/bin/psql -c 'select 1'");
    }

    #[tokio::test]
    async fn test_check_success() {
        let runner = FixedRunner(ExitOutcome::success());
        assert!(runner.check(&Invocation::new("true")).await.is_ok());
    }

    #[tokio::test]
    async fn test_check_failure_reports_exit_code() {
        let runner = FixedRunner(ExitOutcome::failure(3));
        let err = runner
            .check(&Invocation::new("/opt/pg/bin/initdb").arg("-D"))
            .await
            .unwrap_err();

        match err {
            ProvisionError::Subprocess { command, code, .. } => {
                assert_eq!(command, "/opt/pg/bin/initdb -D");
                assert_eq!(code, Some(3));
            }
            other => panic!("Expected Subprocess error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_probe_is_boolean() {
        assert!(FixedRunner(ExitOutcome::success()).probe(&Invocation::new("x")).await);
        assert!(!FixedRunner(ExitOutcome::failure(2)).probe(&Invocation::new("x")).await);
        assert!(!BrokenRunner.probe(&Invocation::new("x")).await);
    }
}
