//! pgprovision - Local PostgreSQL provisioning
//!
//! Entry point for the pgprovision application.

use clap::Parser;
use pgprovision::cli::{Cli, Commands, ConfigCommands, OutputFormat, ShowArgs};
use pgprovision::config::{Config, LogFormat, LogOutput, LoggingConfig};
use pgprovision::error::exit_code;
use pgprovision::recipe::scripts;
use pgprovision::{ExecRunner, ProvisionError, Recipe, ResolvedOptions};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    // Initialize logging based on CLI flags and the logging section
    if let Err(e) = init_logging(&cli, &config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::from(exit_code::GENERAL_ERROR as u8);
    }

    // Execute the command
    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = %e.code(), "{}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Initialize the tracing subscriber.
///
/// `-v`/`-q` win over the configured level; `RUST_LOG` wins over both.
fn init_logging(cli: &Cli, logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let level = cli.log_level().unwrap_or(logging.level);

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level.into()).into())
        .from_env_lossy();

    let writer = match logging.output {
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::File => {
            let path = logging
                .file_path
                .as_deref()
                .ok_or("logging.file_path is required when output is file")?;
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            BoxMakeWriter::new(Mutex::new(file))
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_writer(writer);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }

    Ok(())
}

/// Main application logic.
fn run(cli: &Cli, config: &Config) -> pgprovision::Result<()> {
    if let Some(part) = cli.command.part() {
        tracing::debug!(part, parts = config.parts.len(), "Loaded configuration");
    }

    match &cli.command {
        Commands::Install(args) | Commands::Update(args) => cmd_install(config, &args.part),
        Commands::Uninstall(args) => cmd_uninstall(config, &args.part),
        Commands::Config(subcmd) => cmd_config(config, subcmd),
    }
}

/// Builds the runtime every lifecycle command runs on.
fn runtime() -> pgprovision::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

/// Handle the `install` and `update` commands.
fn cmd_install(config: &Config, part: &str) -> pgprovision::Result<()> {
    let raw = config.part(part)?;
    let mut recipe = Recipe::new(part, &raw, &config.buildout, Arc::new(ExecRunner::new()))?;

    let location = runtime()?.block_on(recipe.install())?;

    println!("{}", location.display());
    Ok(())
}

/// Handle the `uninstall` command.
fn cmd_uninstall(config: &Config, part: &str) -> pgprovision::Result<()> {
    let raw = config.part(part)?;
    runtime()?.block_on(pgprovision::uninstall(
        part,
        &raw,
        &config.buildout,
        Arc::new(ExecRunner::new()),
    ))
}

/// Handle the `config` subcommand.
fn cmd_config(config: &Config, subcmd: &ConfigCommands) -> pgprovision::Result<()> {
    match subcmd {
        ConfigCommands::Validate => {
            for name in config.parts.keys() {
                let raw = config.part(name)?;
                if let Err(e) = ResolvedOptions::resolve(name, &raw, &config.buildout) {
                    println!("✗ Configuration is invalid: {}", e);
                    return Err(e);
                }
            }
            println!(
                "✓ Configuration is valid ({} part{})",
                config.parts.len(),
                if config.parts.len() == 1 { "" } else { "s" }
            );
            Ok(())
        }
        ConfigCommands::Show(args) => cmd_show(config, args),
    }
}

/// Print the resolved options of a part, as sibling parts would see them.
fn cmd_show(config: &Config, args: &ShowArgs) -> pgprovision::Result<()> {
    let raw = config.part(&args.part)?;
    let mut options = ResolvedOptions::resolve(&args.part, &raw, &config.buildout)?;
    scripts::plan_bin_scripts(&mut options);

    let rendered = options.to_options();
    let output = match args.format {
        OutputFormat::Yaml => serde_yaml::to_string(&rendered)
            .map_err(|e| ProvisionError::config_with_source("Failed to serialize options", e))?,
        OutputFormat::Json => serde_json::to_string_pretty(&rendered)?,
    };
    println!("{}", output.trim_end());
    Ok(())
}
