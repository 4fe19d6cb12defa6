//! Error types for storefront requests and review extraction

use std::time::Duration;

use steamline_core::{Attempt, RetryError, TransportError};

/// Longest body excerpt kept in a status error
const BODY_EXCERPT: usize = 200;

/// Why one storefront request did not yield a usable payload.
#[derive(Debug)]
pub enum FetchError {
    Transport(TransportError),
    /// HTTP 429
    RateLimited { retry_after: Option<Duration> },
    /// Any other non-2xx status
    Status { status: u16, body: String },
    /// Body is not the JSON shape we expect
    Malformed(serde_json::Error),
    /// Payload parsed but its `success` flag is false or missing
    NotSuccessful,
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{e}"),
            Self::RateLimited {
                retry_after: Some(d),
            } => write!(f, "rate limited (retry after {}s)", d.as_secs()),
            Self::RateLimited { retry_after: None } => write!(f, "rate limited"),
            Self::Status { status, body } if body.is_empty() => write!(f, "HTTP {status}"),
            Self::Status { status, body } => write!(f, "HTTP {status}: {body}"),
            Self::Malformed(e) => write!(f, "malformed response: {e}"),
            Self::NotSuccessful => write!(f, "response flagged as not successful"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Malformed(e) => Some(e),
            _ => None,
        }
    }
}

impl FetchError {
    pub fn status(status: u16, body: &str) -> Self {
        let body: String = body.chars().take(BODY_EXCERPT).collect();
        Self::Status { status, body }
    }

    /// Network failures and throttling are transient; everything else
    /// means the upstream contract was broken.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::RateLimited { .. } => true,
            Self::Status { .. } | Self::Malformed(_) | Self::NotSuccessful => false,
        }
    }

    /// Wrap for [`steamline_core::retry_with_backoff`]
    pub fn into_attempt(self) -> Attempt<Self> {
        match self {
            Self::RateLimited { retry_after } => Attempt::throttled(self, retry_after),
            e if e.is_retryable() => Attempt::transient(e),
            e => Attempt::Fatal(e),
        }
    }
}

/// Failure of a whole extraction call. No partial records accompany it.
#[derive(Debug)]
pub enum ExtractError {
    /// Rejected before any request was made
    InvalidRequest(String),
    /// Retry ceiling reached on transient failures (only with a ceiling set)
    TransportExhausted {
        target_id: String,
        attempts: u32,
        last: FetchError,
    },
    /// Non-2xx status, malformed body or `success` flag false
    UpstreamRejected { target_id: String, reason: FetchError },
    /// The very first page had no records at all
    NoRecordsFound { target_id: String },
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest(msg) => write!(f, "invalid extraction request: {msg}"),
            Self::TransportExhausted {
                target_id,
                attempts,
                last,
            } => write!(f, "{target_id}: gave up after {attempts} attempts: {last}"),
            Self::UpstreamRejected { target_id, reason } => {
                write!(f, "{target_id}: upstream rejected request: {reason}")
            }
            Self::NoRecordsFound { target_id } => write!(f, "{target_id}: no records found"),
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TransportExhausted { last, .. } => Some(last),
            Self::UpstreamRejected { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl ExtractError {
    pub(crate) fn from_retry(target_id: &str, e: RetryError<FetchError>) -> Self {
        match e {
            RetryError::Exhausted { attempts, last } => Self::TransportExhausted {
                target_id: target_id.to_string(),
                attempts,
                last,
            },
            RetryError::Fatal(FetchError::Transport(e)) => Self::InvalidRequest(e.to_string()),
            RetryError::Fatal(reason) => Self::UpstreamRejected {
                target_id: target_id.to_string(),
                reason,
            },
        }
    }

    /// HTTP status behind an `UpstreamRejected`, if any
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::UpstreamRejected {
                reason: FetchError::Status { status, .. },
                ..
            } => Some(*status),
            _ => None,
        }
    }

    pub fn is_no_records(&self) -> bool {
        matches!(self, Self::NoRecordsFound { .. })
    }
}
