//! Steamline Steam - storefront review and catalog pipeline
//!
//! This crate walks the paginated review feed of the Steam storefront,
//! flattens each review into a single-level record, and reshapes the
//! result into tables ready for persistence.
//!
//! # Example
//!
//! ```no_run
//! use steamline_core::{HttpConfig, HttpTransport};
//! use steamline_steam::{Extractor, Mode};
//!
//! let transport = HttpTransport::new(&HttpConfig::default()).unwrap();
//! let extractor = Extractor::new(transport);
//! let reviews = extractor.extract("730", Mode::Cursor, 100, Some(500)).unwrap();
//! println!("Fetched {} reviews", reviews.len());
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod pagination;
pub mod record;
pub mod transform;

// Re-exports for convenience
pub use config::Config;
pub use error::{ExtractError, FetchError};
pub use pagination::{
    CursorStrategy, Extraction, Extractor, Mode, OffsetStrategy, PageOutcome, PagePosition,
    PageRequest, PageStrategy, PaginationState, StopReason,
};
pub use record::{Fields, Record, RecordShape};
pub use transform::{CleanOptions, ReviewTables, clean, transform_catalog, transform_reviews};
