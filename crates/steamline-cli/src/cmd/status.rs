//! Status subcommand - row counts of stored tables

use anyhow::Result;
use comfy_table::{Cell, CellAlignment, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use steamline_core::fmt_num;
use steamline_db::Database;

use crate::config::Config;

pub fn run(config: &Config) -> Result<()> {
    let path = &config.database.path;
    if !path.exists() {
        eprintln!("No database at {}", path.display());
        return Ok(());
    }

    let db = Database::connect(path)?;
    let counts = db.table_counts()?;
    if counts.is_empty() {
        eprintln!("Database {} has no tables.", path.display());
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Table").fg(Color::Cyan),
            Cell::new("Rows").fg(Color::Cyan),
        ]);
    for (name, n) in &counts {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(fmt_num(*n as usize)).set_alignment(CellAlignment::Right),
        ]);
    }
    eprintln!("\n{}\n{table}", path.display());
    Ok(())
}
