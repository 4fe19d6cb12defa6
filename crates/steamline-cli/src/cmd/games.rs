//! Games subcommand - refresh the application catalog

use std::time::Instant;

use anyhow::{Context, Result};
use steamline_core::{HttpTransport, SharedProgress, ThreadSleeper, fmt_num};
use steamline_db::Database;
use steamline_steam::{CleanOptions, api, transform_catalog};

use super::print_summary;
use crate::config::Config;

pub fn run(config: &Config, progress: &SharedProgress) -> Result<()> {
    let start = Instant::now();
    let transport = HttpTransport::new(&config.http_config()).context("Failed to build HTTP client")?;

    let pb = progress.stage_line("games");
    let records = api::fetch_app_list(
        &transport,
        &config.steam.app_list_url,
        &config.retry_policy(),
        &ThreadSleeper,
        &pb,
    )?;

    pb.set_message("cleaning...");
    let table = transform_catalog(&records, &CleanOptions::steam_catalog());

    pb.set_message("writing...");
    let mut db = Database::connect(&config.database.path)?;
    log::info!("Connected to {}", config.database.path.display());
    let written = db.replace("games", &table)?;
    pb.finish_and_clear();

    print_summary(
        "Games",
        &[
            ("Fetched", fmt_num(records.len())),
            ("Stored", fmt_num(written)),
            ("Database", config.database.path.display().to_string()),
            ("Time", format!("{:.1}s", start.elapsed().as_secs_f64())),
        ],
    );
    Ok(())
}
