use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::eyre;
use commands::{config, daemon, run};
use media_cleanup_config::{Config, PathManager};
use std::path::{Path, PathBuf};

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "prunarr")]
#[command(about = "Prunarr - Clean up watched and forgotten media, with a leaving-soon warning first")]
#[command(version)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Config file (defaults to config.toml in the prunarr config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one cleanup pass over the configured libraries
    #[command(long_about = "Evaluate every configured library once: filter by watch history and age, apply exclusion rules, then tag, delete or untag items. Without --dry-run or --live the config's dry_run setting decides.")]
    Run {
        /// Log every mutation instead of performing it, and write plans to the reports directory
        #[arg(long, action = ArgAction::SetTrue, conflicts_with = "live")]
        dry_run: bool,

        /// Perform mutations even if the config says dry_run = true
        #[arg(long, action = ArgAction::SetTrue)]
        live: bool,

        /// Only process this library (repeatable)
        #[arg(long = "library", value_name = "NAME")]
        libraries: Vec<String>,
    },
    /// Run on a schedule until interrupted
    #[command(long_about = "Run prunarr as a long-lived process that performs a cleanup on every tick of the configured schedule. A run is performed on startup unless --no-startup-run is given or scheduler.run_on_startup is false.")]
    Daemon {
        /// Preset (hourly, daily, weekly, monthly) or a 5-field cron expression, evaluated in UTC
        #[arg(long, value_name = "SCHEDULE")]
        schedule: Option<String>,

        /// Skip the run on startup
        #[arg(long, action = ArgAction::SetTrue)]
        no_startup_run: bool,

        /// Write logs to this file with daily rotation
        #[arg(long, value_name = "PATH")]
        log_file: Option<PathBuf>,
    },
    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Load and validate the config, then list the libraries
    Check,
    /// Print the config file path
    Path,
}

/// Logging settings from the config file, if it can be read. Validation errors are
/// reported later by the command itself.
fn configured_logging(explicit: Option<&Path>) -> (Option<PathBuf>, Option<bool>) {
    let path = commands::config_path(explicit, &PathManager::default());
    let logging = std::fs::read_to_string(path)
        .ok()
        .and_then(|content| toml::from_str::<Config>(&content).ok())
        .and_then(|config| config.logging);
    match logging {
        Some(logging) => (logging.file, logging.json),
        None => (None, None),
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let (configured_file, configured_json) = configured_logging(config_path);
    let log_file = match &cli.command {
        Commands::Daemon { log_file, .. } => log_file.clone().or(configured_file),
        _ => None,
    };
    logging::init_logging(cli.verbose, cli.quiet, configured_json, log_file.as_deref())
        .map_err(|e| eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    let result = match cli.command {
        Commands::Run { dry_run, live, libraries } => {
            run::run_once(config_path, dry_run, live, libraries, &output).await
        }
        Commands::Daemon { schedule, no_startup_run, .. } => {
            daemon::run_daemon(config_path, schedule, no_startup_run, &output).await
        }
        Commands::Config { cmd } => match cmd {
            ConfigCommands::Check => config::run_check(config_path, &output),
            ConfigCommands::Path => config::run_path(config_path, &output),
        },
    };

    if let Err(e) = &result {
        tracing::error!(operation = "command_failed", error = %e, "Command failed");
    }
    result
}
