//! steamline - Steam review and catalog ETL
//!
//! Pulls the application catalog and per-app reviews from the Steam
//! storefront, cleans them, and stores them in a local DuckDB database
//! that can be exported to CSV.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use steamline_steam::ExtractError;

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "steamline")]
#[command(about = "Steam review and catalog ETL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./steamline.toml or ~/.config/steamline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides config)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Maximum retry attempts for transient failures (default: unlimited)
    #[arg(long, global = true)]
    max_retries: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Refresh the application catalog into the games table
    Games,
    /// Fetch, clean and store reviews of one app
    Reviews(cmd::reviews::ReviewsArgs),
    /// Export stored tables to CSV
    Export(cmd::export::ExportArgs),
    /// Show row counts of stored tables
    Status,
    /// Show current configuration
    Config,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(ExtractError::NoRecordsFound { target_id }) = e.downcast_ref::<ExtractError>() {
                eprintln!("No reviews found for app {target_id}");
                return ExitCode::from(2);
            }
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // Progress context (TTY auto-detect)
    let progress = Arc::new(steamline_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug, spinners show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = is_tty && !cli.debug;
    steamline_core::init_logging(steamline_core::Verbosity::from_flags(quiet, cli.debug), multi);

    let mut config = if let Some(path) = &cli.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // CLI overrides
    if let Some(path) = cli.database {
        config.database.path = path;
    }
    if cli.max_retries.is_some() {
        config.http.max_retries = cli.max_retries;
    }

    match cli.command {
        Command::Games => cmd::games::run(&config, &progress),
        Command::Reviews(args) => cmd::reviews::run(args, &config, &progress),
        Command::Export(args) => cmd::export::run(args, &config),
        Command::Status => cmd::status::run(&config),
        Command::Config => {
            let max_retries = config
                .http
                .max_retries
                .map_or("unlimited".to_string(), |n| n.to_string());
            cmd::print_summary(
                "Setting",
                &[
                    ("Database", config.database.path.display().to_string()),
                    ("CSV directory", config.output.csv_dir.display().to_string()),
                    ("Reviews URL", config.steam.reviews_url.clone()),
                    ("App list URL", config.steam.app_list_url.clone()),
                    ("Mode", config.steam.mode.clone()),
                    ("Page size", config.steam.page_size.to_string()),
                    ("Request timeout", format!("{}s", config.http.request_timeout)),
                    (
                        "Backoff",
                        format!(
                            "{}ms .. {}s (+{}ms jitter)",
                            config.http.initial_backoff_ms,
                            config.http.max_backoff,
                            config.http.max_jitter_ms
                        ),
                    ),
                    ("Max retries", max_retries),
                    (
                        "Clean thresholds",
                        format!(
                            "row fill >= {}, column missing <= {}",
                            config.clean.min_row_fill, config.clean.max_column_missing
                        ),
                    ),
                ],
            );
            Ok(())
        }
    }
}
