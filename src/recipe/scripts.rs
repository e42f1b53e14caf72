//! Wrapper script generation.
//!
//! Every wrapped PostgreSQL binary gets a small bash script in the bin
//! directory that exports the right environment and `exec`s the real
//! binary. Two dispatchers, `<part>_server` and `<part>_client`, do the same
//! for an arbitrary binary named by their first argument.

use crate::error::{ProvisionError, Result};
use crate::recipe::options::ResolvedOptions;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment profile baked into a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// `PGDATA` only.
    Server,
    /// `PGHOST` and `PGPORT`.
    Client,
}

impl Profile {
    /// Suffix of the dispatcher script for this profile.
    pub fn suffix(&self) -> &'static str {
        match self {
            Profile::Server => "server",
            Profile::Client => "client",
        }
    }

    /// Environment variables of this profile.
    pub fn env(&self, options: &ResolvedOptions) -> BTreeMap<String, String> {
        match self {
            Profile::Server => options.server_env(),
            Profile::Client => options.client_env(),
        }
    }
}

/// Commands that get a dedicated wrapper, with their profile.
pub const WRAPPED_COMMANDS: &[(&str, Profile)] = &[
    ("pg_ctl", Profile::Server),
    ("postgres", Profile::Server),
    ("psql", Profile::Client),
    ("pg_isready", Profile::Client),
];

fn env_prefix(env: &BTreeMap<String, String>) -> String {
    env.iter()
        .map(|(key, value)| format!("{}={}", key, shell_words::quote(value)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn exec_line(env: &BTreeMap<String, String>, target: &str) -> String {
    let prefix = env_prefix(env);
    if prefix.is_empty() {
        format!("exec {} \"$@\"", target)
    } else {
        format!("{} exec {} \"$@\"", prefix, target)
    }
}

/// Builds a wrapper that runs `binary` with `env`, forwarding all arguments.
pub fn build_script(env: &BTreeMap<String, String>, binary: &Path) -> String {
    let target = shell_words::quote(&binary.display().to_string()).into_owned();
    format!("#!/bin/bash\n{}\n", exec_line(env, &target))
}

/// Builds a dispatcher that runs `<bin_dir>/<first argument>` with `env`.
pub fn build_dispatcher(env: &BTreeMap<String, String>, bin_dir: &Path) -> String {
    let target = format!(
        "{}/\"$command\"",
        shell_words::quote(&bin_dir.display().to_string())
    );
    format!(
        r#"#!/bin/bash
read -r -d '' USAGE <<EOM
Usage:

$0 <command> [args ...]
EOM

if [[ $# -eq 0 ]]; then
	echo "$USAGE"
	exit 1
fi
command=$1
shift
{}
"#,
        exec_line(env, &target)
    )
}

/// Writes every wrapper and both dispatchers, recording their paths in
/// `options.scripts`.
pub fn create_bin_scripts(options: &mut ResolvedOptions) -> Result<()> {
    fs::create_dir_all(&options.bin_dir)
        .map_err(|e| ProvisionError::filesystem(&options.bin_dir, e))?;

    for (command, profile) in WRAPPED_COMMANDS {
        let code = build_script(&profile.env(options), &options.pg_binary(command));
        let path = write_script(&options.bin_dir, command, &code)?;
        options.scripts.insert(command.to_string(), path);
    }

    for profile in [Profile::Server, Profile::Client] {
        let command = dispatcher_name(&options.name, profile);
        let code = build_dispatcher(&profile.env(options), &options.pg_bin_dir);
        let path = write_script(&options.bin_dir, &command, &code)?;
        options.scripts.insert(command, path);
    }

    Ok(())
}

/// Records the script paths `create_bin_scripts` would produce, without
/// writing anything.
pub fn plan_bin_scripts(options: &mut ResolvedOptions) {
    let commands = WRAPPED_COMMANDS
        .iter()
        .map(|(command, _)| command.to_string())
        .chain([Profile::Server, Profile::Client].map(|p| dispatcher_name(&options.name, p)))
        .collect::<Vec<_>>();

    for command in commands {
        let path = options.bin_dir.join(&command);
        options.scripts.insert(command, path);
    }
}

/// Name of the dispatcher script of `part` for `profile`.
pub fn dispatcher_name(part: &str, profile: Profile) -> String {
    format!("{}_{}", part, profile.suffix())
}

fn write_script(bin_dir: &Path, command: &str, code: &str) -> Result<PathBuf> {
    let path = bin_dir.join(command);
    fs::write(&path, code).map_err(|e| ProvisionError::filesystem(&path, e))?;
    make_executable(&path)?;
    debug!(script = %path.display(), "Wrote script");
    Ok(path)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|e| ProvisionError::filesystem(path, e))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildoutConfig;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn options_in(dir: &Path) -> ResolvedOptions {
        let raw: BTreeMap<String, String> = [
            ("bin", "/opt/pg/bin".to_string()),
            ("pgdata", dir.join("pgdata").display().to_string()),
            ("bin-directory", dir.join("bin").display().to_string()),
            ("port", "5544".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        ResolvedOptions::resolve("postgres", &raw, &BuildoutConfig::default()).unwrap()
    }

    #[test]
    fn test_build_server_script() {
        let script = build_script(
            &env(&[("PGDATA", "/data/pg")]),
            Path::new("/opt/pg/bin/pg_ctl"),
        );

        assert_eq!(
            script,
            "#!/bin/bash\nPGDATA=/data/pg exec /opt/pg/bin/pg_ctl \"$@\"\n"
        );
    }

    #[test]
    fn test_build_client_script() {
        let script = build_script(
            &env(&[("PGHOST", "/data/pg"), ("PGPORT", "5433")]),
            Path::new("/opt/pg/bin/psql"),
        );

        assert_eq!(
            script,
            "#!/bin/bash\nPGHOST=/data/pg PGPORT=5433 exec /opt/pg/bin/psql \"$@\"\n"
        );
    }

    #[test]
    fn test_build_script_quotes_paths() {
        let script = build_script(
            &env(&[("PGDATA", "/srv/my data")]),
            Path::new("/opt/my pg/bin/postgres"),
        );

        assert!(script.contains("PGDATA='/srv/my data'"));
        assert!(script.contains("exec '/opt/my pg/bin/postgres' \"$@\""));
    }

    #[test]
    fn test_build_dispatcher() {
        let script = build_dispatcher(&env(&[("PGDATA", "/data/pg")]), Path::new("/opt/pg/bin"));

        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains("if [[ $# -eq 0 ]]; then"));
        assert!(script.contains("command=$1\nshift\n"));
        assert!(script.ends_with("PGDATA=/data/pg exec /opt/pg/bin/\"$command\" \"$@\"\n"));
    }

    #[test]
    fn test_create_bin_scripts() {
        let dir = TempDir::new().unwrap();
        let mut options = options_in(dir.path());

        create_bin_scripts(&mut options).unwrap();

        let expected = [
            "pg_ctl",
            "pg_isready",
            "postgres",
            "postgres_client",
            "postgres_server",
            "psql",
        ];
        assert_eq!(
            options.scripts.keys().map(String::as_str).collect::<Vec<_>>(),
            expected
        );

        for command in expected {
            let path = dir.path().join("bin").join(command);
            assert_eq!(options.scripts[command], path);
            assert!(path.exists(), "missing script {}", command);
        }

        let pg_ctl = fs::read_to_string(&options.scripts["pg_ctl"]).unwrap();
        assert!(pg_ctl.contains(&format!("PGDATA={}", options.pgdata.display())));
        assert!(pg_ctl.contains("exec /opt/pg/bin/pg_ctl"));

        let isready = fs::read_to_string(&options.scripts["pg_isready"]).unwrap();
        assert!(isready.contains("PGPORT=5544"));
        assert!(!isready.contains("PGDATA"));

        let client = fs::read_to_string(&options.scripts["postgres_client"]).unwrap();
        assert!(client.contains("PGPORT=5544 exec /opt/pg/bin/\"$command\""));
    }

    #[cfg(unix)]
    #[test]
    fn test_scripts_are_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let mut options = options_in(dir.path());
        create_bin_scripts(&mut options).unwrap();

        for path in options.scripts.values() {
            let mode = fs::metadata(path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755, "{} is not 0755", path.display());
        }
    }

    #[test]
    fn test_plan_matches_created_scripts() {
        let dir = TempDir::new().unwrap();
        let mut planned = options_in(dir.path());
        plan_bin_scripts(&mut planned);
        assert!(!dir.path().join("bin").exists());

        let mut created = options_in(dir.path());
        create_bin_scripts(&mut created).unwrap();

        assert_eq!(planned.scripts, created.scripts);
    }

    #[test]
    fn test_dispatcher_name() {
        assert_eq!(dispatcher_name("db", Profile::Server), "db_server");
        assert_eq!(dispatcher_name("db", Profile::Client), "db_client");
    }

    #[test]
    fn test_create_bin_scripts_overwrites() {
        let dir = TempDir::new().unwrap();
        let mut options = options_in(dir.path());
        create_bin_scripts(&mut options).unwrap();

        options.port = "6000".to_string();
        create_bin_scripts(&mut options).unwrap();

        let psql = fs::read_to_string(&options.scripts["psql"]).unwrap();
        assert!(psql.contains("PGPORT=6000"));
        assert!(!psql.contains("PGPORT=5544"));
    }
}
