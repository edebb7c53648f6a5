//! JsonUI Test CLI - Main Entry Point
//!
//! Lists, checks and rehearses declarative JSON UI tests.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use jsonui_test::RunnerConfig;

mod commands;
mod output;

use commands::{check, list, rehearse};

/// JsonUI Test - declarative JSON UI test runner
#[derive(Parser)]
#[command(name = "jsonui-test")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Runner configuration file (TOML)
    #[arg(long, env = "JSONUI_TEST_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Platform to run as (overrides the config file)
    #[arg(long, global = true)]
    platform: Option<String>,

    /// Default per-step timeout in milliseconds (overrides the config file)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Do not capture screenshots on failure
    #[arg(long, global = true)]
    no_screenshots: bool,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List test files under a path
    List(list::ListArgs),

    /// Validate tests: load, resolve references, classify every step
    Check(check::CheckArgs),

    /// Run tests against a scripted driver in which every element exists
    Rehearse(rehearse::RehearseArgs),
}

impl Cli {
    /// Config file values with command-line overrides applied
    fn runner_config(&self) -> anyhow::Result<RunnerConfig> {
        let mut config = match &self.config {
            Some(path) => RunnerConfig::load(path)?,
            None => RunnerConfig::default(),
        };
        if let Some(platform) = &self.platform {
            config.platform = platform.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.default_timeout_ms = timeout_ms;
        }
        if self.no_screenshots {
            config.screenshot_on_failure = false;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let config = cli.runner_config()?;

    let ok = match cli.command {
        Commands::List(args) => list::execute(args, cli.format)?,
        Commands::Check(args) => check::execute(args)?,
        Commands::Rehearse(args) => rehearse::execute(args, config, cli.format).await?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
