//! Export subcommand - dump stored tables to CSV

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use steamline_db::Database;

use super::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output directory (default from config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Tables to export (comma-separated)
    #[arg(long, value_delimiter = ',', default_value = "games,reviews,users")]
    pub tables: Vec<String>,
}

pub fn run(args: ExportArgs, config: &Config) -> Result<()> {
    let output_dir = args.output.unwrap_or_else(|| config.output.csv_dir.clone());
    let db = Database::connect(&config.database.path)?;

    let tables: Vec<&str> = args.tables.iter().map(String::as_str).collect();
    let written = db.export_csv(&tables, &output_dir)?;
    if written.is_empty() {
        anyhow::bail!("None of the requested tables exist: {}", args.tables.join(", "));
    }

    let rows: Vec<(&str, String)> = written
        .iter()
        .map(|p| ("File", p.display().to_string()))
        .collect();
    print_summary("Export", &rows);
    Ok(())
}
