//! Steamline Core - Common infrastructure for storefront extraction pipelines
//!
//! This crate provides the HTTP transport, retry/backoff policy and the
//! tabular value model shared by the extraction, transform and
//! persistence crates.

pub mod error;
pub mod http;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod table;

// Re-exports for convenience
pub use error::TransportError;
pub use http::{HttpConfig, HttpResponse, HttpTransport, Transport, parse_retry_after};
pub use logging::{IndicatifLogger, Verbosity, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use retry::{Attempt, RetryError, RetryPolicy, Sleeper, ThreadSleeper, retry_with_backoff};
pub use table::{Table, Value, ValueKind};
