//! Paginated review extraction
//!
//! One engine walks the review feed page by page. The addressing scheme
//! (cursor or offset) is a [`PageStrategy`]; the retry loop, deduplication
//! and record limit are shared.

mod state;
mod strategy;

pub use state::{PagePosition, PaginationState};
pub use strategy::{
    CursorStrategy, Mode, OffsetStrategy, PageOutcome, PageRequest, PageStrategy, START_CURSOR,
    StopReason,
};

use indicatif::ProgressBar;
use steamline_core::{RetryPolicy, Sleeper, ThreadSleeper, Transport, fmt_num, retry_with_backoff};

use crate::api::{self, DEFAULT_REVIEWS_URL};
use crate::config::Config;
use crate::error::ExtractError;
use crate::record::{Record, RecordShape};

/// Result of a completed extraction
#[derive(Debug)]
pub struct Extraction {
    pub records: Vec<Record>,
    pub pages: usize,
    pub stop: StopReason,
}

/// Review extractor bound to one transport and one clock.
pub struct Extractor<T, S = ThreadSleeper> {
    transport: T,
    sleeper: S,
    base_url: String,
    shape: RecordShape,
    policy: RetryPolicy,
    pb: ProgressBar,
}

impl<T: Transport> Extractor<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            sleeper: ThreadSleeper,
            base_url: DEFAULT_REVIEWS_URL.to_string(),
            shape: RecordShape::default(),
            policy: RetryPolicy::default(),
            pb: ProgressBar::hidden(),
        }
    }

    /// Extractor with the endpoint and retry policy of `config`
    pub fn from_config(transport: T, config: &Config) -> Self {
        Self::new(transport)
            .with_base_url(&config.reviews_url)
            .with_retry_policy(config.retry)
    }
}

impl<T: Transport, S: Sleeper> Extractor<T, S> {
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> Extractor<T, S2> {
        Extractor {
            transport: self.transport,
            sleeper,
            base_url: self.base_url,
            shape: self.shape,
            policy: self.policy,
            pb: self.pb,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn with_shape(mut self, shape: RecordShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.pb = pb;
        self
    }

    /// Fetch every review of `target_id`, up to `record_limit`.
    ///
    /// The limit is best-effort: the page that reaches it is kept whole.
    /// `Some(0)` means no limit.
    pub fn extract(
        &self,
        target_id: &str,
        mode: Mode,
        page_size: u32,
        record_limit: Option<usize>,
    ) -> Result<Vec<Record>, ExtractError> {
        self.extract_with_summary(target_id, mode, page_size, record_limit)
            .map(|e| e.records)
    }

    pub fn extract_with_summary(
        &self,
        target_id: &str,
        mode: Mode,
        page_size: u32,
        record_limit: Option<usize>,
    ) -> Result<Extraction, ExtractError> {
        match mode {
            Mode::Cursor => {
                self.extract_with(&CursorStrategy::default(), target_id, page_size, record_limit)
            }
            Mode::Offset => self.extract_with(&OffsetStrategy, target_id, page_size, record_limit),
        }
    }

    /// Run the page loop with an explicit strategy.
    pub fn extract_with(
        &self,
        strategy: &impl PageStrategy,
        target_id: &str,
        page_size: u32,
        record_limit: Option<usize>,
    ) -> Result<Extraction, ExtractError> {
        if target_id.trim().is_empty() {
            return Err(ExtractError::InvalidRequest("target id is empty".to_string()));
        }
        if page_size == 0 {
            return Err(ExtractError::InvalidRequest(
                "page size must be positive".to_string(),
            ));
        }
        let limit = record_limit.filter(|&n| n > 0);
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), target_id);

        let mut state = PaginationState::new(strategy.initial_position());
        let mut records = Vec::new();

        let stop = loop {
            let request = strategy.build_request(target_id, page_size, &state);
            let query = request.query();
            let label = format!("{target_id} page {}", state.pages + 1);

            let page = retry_with_backoff(&label, &self.policy, &self.sleeper, &self.pb, || {
                let resp = api::send_checked(&self.transport, &url, &query)?;
                api::parse_review_page(&resp.body).map_err(|e| e.into_attempt())
            })
            .map_err(|e| ExtractError::from_retry(target_id, e))?;

            state.pages += 1;
            let raw_count = page.reviews.len();
            if state.pages == 1 && raw_count == 0 {
                log::info!("{target_id}: no reviews");
                return Err(ExtractError::NoRecordsFound {
                    target_id: target_id.to_string(),
                });
            }

            let normalized = page
                .reviews
                .into_iter()
                .map(|raw| self.shape.normalize(raw))
                .collect();
            let new_records = state.absorb(normalized, &self.shape, &mut records);
            let outcome = PageOutcome {
                raw_count,
                new_records,
                next_cursor: page.cursor,
            };

            log::debug!(
                "{target_id}: page {} returned {raw_count} records ({new_records} new)",
                state.pages
            );
            self.pb.set_message(format!(
                "{target_id}: {} reviews, {} pages",
                fmt_num(state.accumulated),
                state.pages
            ));

            if limit.is_some_and(|n| state.accumulated >= n) {
                break StopReason::LimitReached;
            }
            if let Some(reason) = strategy.should_stop(&state, page_size, &outcome) {
                break reason;
            }
            strategy.advance(&mut state, &outcome);
        };

        log::info!(
            "{target_id}: stopped after {} pages ({stop}), {} reviews",
            state.pages,
            fmt_num(records.len())
        );
        Ok(Extraction {
            records,
            pages: state.pages,
            stop,
        })
    }
}
