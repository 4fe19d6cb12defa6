//! Reviews subcommand - extract, clean and store the reviews of one app

use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use steamline_core::{HttpTransport, SharedProgress, fmt_num};
use steamline_db::Database;
use steamline_steam::{CleanOptions, Extractor, Mode, transform_reviews};

use super::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ReviewsArgs {
    /// Steam app id
    #[arg(short, long)]
    pub game_id: u32,

    /// Stop after at least this many reviews (0 = no limit)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Pagination mode (default from config)
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Reviews per page
    #[arg(long)]
    pub page_size: Option<u32>,
}

#[derive(Clone, Copy, ValueEnum, Debug)]
pub enum ModeArg {
    Cursor,
    Offset,
}

impl From<ModeArg> for Mode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Cursor => Mode::Cursor,
            ModeArg::Offset => Mode::Offset,
        }
    }
}

pub fn run(args: ReviewsArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let start = Instant::now();
    let steam = config.steam_config()?;
    let mode = args.mode.map_or(steam.mode, Mode::from);
    let page_size = args.page_size.unwrap_or(steam.page_size);
    let target_id = args.game_id.to_string();

    log::info!("Fetching reviews for app {target_id}");
    log::info!("  Mode: {mode}, page size: {page_size}");
    if let Some(limit) = args.limit.filter(|&n| n > 0) {
        log::info!("  Limit: {limit}");
    }

    let transport = HttpTransport::new(&config.http_config()).context("Failed to build HTTP client")?;
    let pb = progress.stage_line("reviews");
    let extraction = Extractor::from_config(transport, &steam)
        .with_progress(pb.clone())
        .extract_with_summary(&target_id, mode, page_size, args.limit)
        .with_context(|| format!("Failed to extract reviews for app {target_id}"))?;

    pb.set_message("cleaning...");
    let opts = CleanOptions::steam_reviews()
        .with_thresholds(config.clean.min_row_fill, config.clean.max_column_missing);
    let tables = transform_reviews(i64::from(args.game_id), &extraction.records, &opts);

    pb.set_message("writing...");
    let mut db = Database::connect(&config.database.path)?;
    log::info!("Connected to {}", config.database.path.display());
    let new_reviews = db.append("reviews", &tables.reviews, Some("recommendationid"))?;
    let new_users = db.append("users", &tables.users, Some("steamid"))?;
    pb.finish_and_clear();

    print_summary(
        &format!("App {target_id}"),
        &[
            (
                "Pages",
                format!("{} ({})", extraction.pages, extraction.stop),
            ),
            ("Fetched", fmt_num(extraction.records.len())),
            (
                "Reviews",
                format!("{} new of {}", fmt_num(new_reviews), fmt_num(tables.reviews.len())),
            ),
            (
                "Users",
                format!("{} new of {}", fmt_num(new_users), fmt_num(tables.users.len())),
            ),
            ("Time", format!("{:.1}s", start.elapsed().as_secs_f64())),
        ],
    );
    Ok(())
}
