//! Application catalog into the `games` table

use steamline_core::Table;

use super::clean::{CleanOptions, clean};
use crate::record::Record;

/// Columns of the `games` table
pub const GAME_COLUMNS: [&str; 2] = ["appid", "name"];

/// Clean the application catalog into `appid, name` rows.
pub fn transform_catalog(records: &[Record], opts: &CleanOptions) -> Table {
    let table = clean(records, opts);
    log::info!("Catalog: {} of {} apps kept after cleaning", table.len(), records.len());
    table.select(&GAME_COLUMNS)
}
