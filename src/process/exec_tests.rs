//! Tests for ExecRunner.

#[cfg(test)]
mod tests {
    use crate::error::ProvisionError;
    use crate::process::backend::{CommandRunner, Invocation};
    use crate::process::exec::ExecRunner;
    use std::collections::BTreeMap;
    use std::time::Duration;

    #[test]
    fn test_exec_runner_name() {
        assert_eq!(ExecRunner::new().name(), "exec");
    }

    #[tokio::test]
    async fn test_run_success() {
        let outcome = ExecRunner::new().run(&Invocation::new("true")).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.code, Some(0));
    }

    #[tokio::test]
    async fn test_run_failure_is_not_an_error() {
        let outcome = ExecRunner::new().run(&Invocation::new("false")).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.code, Some(1));
    }

    #[tokio::test]
    async fn test_run_returns_when_child_leaves_background_process() {
        // Same shape as `pg_ctl start`: the server outlives the command and
        // keeps the descriptors it inherited.
        let invocation = Invocation::new("sh").args(["-c", "sleep 8 & exit 0"]);

        let runner = ExecRunner::new();
        let outcome = tokio::time::timeout(Duration::from_secs(3), runner.check(&invocation))
            .await
            .expect("runner waited for the background process");

        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn test_quiet_run_reports_status() {
        let invocation = Invocation::new("sh")
            .args(["-c", "echo not ready; exit 2"])
            .quiet();
        let outcome = ExecRunner::new().run(&invocation).await.unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.code, Some(2));
    }

    #[tokio::test]
    async fn test_shell_invocation_applies_redirects() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("schema.sql");
        let output = dir.path().join("applied.sql");
        std::fs::write(&input, "create table t ();\n").unwrap();

        let script = format!(
            "cat < {} > {}",
            shell_words::quote(&input.display().to_string()),
            shell_words::quote(&output.display().to_string())
        );
        ExecRunner::new()
            .check(&Invocation::shell(script))
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "create table t ();\n"
        );
    }

    #[tokio::test]
    async fn test_run_passes_environment() {
        let mut env = BTreeMap::new();
        env.insert("PGHOST".to_string(), "/tmp/pg socket".to_string());
        env.insert("PGPORT".to_string(), "5433".to_string());

        let invocation = Invocation::new("sh")
            .args(["-c", "test \"$PGHOST\" = '/tmp/pg socket' && test \"$PGPORT\" = 5433"])
            .envs(env);

        let outcome = ExecRunner::new().run(&invocation).await.unwrap();
        assert!(outcome.success, "environment not passed");
    }

    #[tokio::test]
    async fn test_run_missing_binary() {
        let invocation = Invocation::new("/nonexistent/bin/initdb");
        let err = ExecRunner::new().run(&invocation).await.unwrap_err();

        assert!(matches!(err, ProvisionError::Spawn { .. }));
        assert!(err.to_string().contains("/nonexistent/bin/initdb"));
    }

    #[tokio::test]
    async fn test_check_propagates_exit_code() {
        let invocation = Invocation::new("sh").args(["-c", "exit 7"]);
        let err = ExecRunner::new().check(&invocation).await.unwrap_err();

        match err {
            ProvisionError::Subprocess { code, .. } => assert_eq!(code, Some(7)),
            other => panic!("Expected Subprocess error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_probe() {
        let runner = ExecRunner::new();
        assert!(runner.probe(&Invocation::new("true")).await);
        assert!(!runner.probe(&Invocation::new("false")).await);
        assert!(!runner.probe(&Invocation::new("/nonexistent/pg_isready")).await);
    }
}
