//! Cleaning and reshaping of extracted records

mod clean;
mod games;
mod reviews;

pub use clean::{CleanOptions, clean, clean_table, dedupe_rows, records_to_table, sanitize_text};
pub use games::{GAME_COLUMNS, transform_catalog};
pub use reviews::{REVIEW_COLUMNS, ReviewTables, USER_COLUMNS, transform_reviews};
