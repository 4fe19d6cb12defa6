//! Cursor and offset addressing for the review feed

use std::fmt;

use crate::api::REVIEW_FILTERS;
use crate::pagination::state::{PagePosition, PaginationState};

/// Sentinel cursor for the first page
pub const START_CURSOR: &str = "*";

/// Addressing scheme of the review feed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Cursor,
    Offset,
}

impl Mode {
    /// Parse CLI/config string into enum
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "cursor" => Some(Self::Cursor),
            "offset" => Some(Self::Offset),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Cursor => "cursor",
            Self::Offset => "offset",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable description of one page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub target_id: String,
    pub page_size: u32,
    pub position: PagePosition,
}

impl PageRequest {
    /// Query parameters for `appreviews/{target_id}`
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("json", "1".to_string()),
            ("num_per_page", self.page_size.to_string()),
        ];
        match &self.position {
            PagePosition::Cursor(token) => query.push(("cursor", token.clone())),
            PagePosition::Offset(offset) => query.push(("start_offset", offset.to_string())),
        }
        query.extend(REVIEW_FILTERS.iter().map(|(k, v)| (*k, v.to_string())));
        query
    }
}

/// What one successful page contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    /// Records in the response, before deduplication
    pub raw_count: usize,
    /// Records kept after deduplication
    pub new_records: usize,
    pub next_cursor: Option<String>,
}

/// Why pagination ended normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Cursor mode: no new records. Offset mode: no records at all.
    EmptyPage,
    /// Offset mode: fewer records than requested
    ShortPage,
    /// Cursor mode: the feed handed back a cursor it already issued
    CursorRepeated,
    /// Cursor mode: no next cursor
    CursorExhausted,
    LimitReached,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EmptyPage => "empty page",
            Self::ShortPage => "last page",
            Self::CursorRepeated => "repeated cursor",
            Self::CursorExhausted => "no next cursor",
            Self::LimitReached => "record limit reached",
        })
    }
}

/// Addressing variant plugged into the shared extraction loop.
pub trait PageStrategy {
    fn initial_position(&self) -> PagePosition;

    fn build_request(&self, target_id: &str, page_size: u32, state: &PaginationState) -> PageRequest {
        PageRequest {
            target_id: target_id.to_string(),
            page_size,
            position: state.position.clone(),
        }
    }

    fn should_stop(
        &self,
        state: &PaginationState,
        page_size: u32,
        page: &PageOutcome,
    ) -> Option<StopReason>;

    fn advance(&self, state: &mut PaginationState, page: &PageOutcome);
}

/// Follow the continuation token issued with each page.
#[derive(Debug, Clone)]
pub struct CursorStrategy {
    start: String,
}

impl CursorStrategy {
    pub fn starting_at(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
        }
    }
}

impl Default for CursorStrategy {
    fn default() -> Self {
        Self::starting_at(START_CURSOR)
    }
}

impl PageStrategy for CursorStrategy {
    fn initial_position(&self) -> PagePosition {
        PagePosition::Cursor(self.start.clone())
    }

    fn should_stop(
        &self,
        state: &PaginationState,
        _page_size: u32,
        page: &PageOutcome,
    ) -> Option<StopReason> {
        if page.new_records == 0 {
            return Some(StopReason::EmptyPage);
        }
        match page.next_cursor.as_deref() {
            None | Some("") => Some(StopReason::CursorExhausted),
            Some(next) if state.seen_cursors.contains(next) => Some(StopReason::CursorRepeated),
            Some(_) => None,
        }
    }

    fn advance(&self, state: &mut PaginationState, page: &PageOutcome) {
        if let Some(next) = &page.next_cursor {
            state.seen_cursors.insert(next.clone());
            state.position = PagePosition::Cursor(next.clone());
        }
    }
}

/// Walk the feed by record offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct OffsetStrategy;

impl PageStrategy for OffsetStrategy {
    fn initial_position(&self) -> PagePosition {
        PagePosition::Offset(0)
    }

    fn should_stop(
        &self,
        _state: &PaginationState,
        page_size: u32,
        page: &PageOutcome,
    ) -> Option<StopReason> {
        if page.raw_count == 0 {
            Some(StopReason::EmptyPage)
        } else if page.raw_count < page_size as usize {
            Some(StopReason::ShortPage)
        } else {
            None
        }
    }

    /// Offsets address upstream positions, so they advance by the raw
    /// count even when some records were duplicates.
    fn advance(&self, state: &mut PaginationState, page: &PageOutcome) {
        if let PagePosition::Offset(offset) = &mut state.position {
            *offset += page.raw_count as u64;
        }
    }
}
