//! Per-call pagination state

use std::collections::HashSet;

use crate::record::{Record, RecordShape};

/// Where the next page starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagePosition {
    /// Opaque continuation token
    Cursor(String),
    /// Number of upstream records already walked past
    Offset(u64),
}

/// State owned by one extraction call and dropped at its end.
#[derive(Debug)]
pub struct PaginationState {
    pub position: PagePosition,
    pub seen_ids: HashSet<String>,
    /// Cursors already requested or issued (cursor mode only)
    pub seen_cursors: HashSet<String>,
    pub accumulated: usize,
    pub pages: usize,
}

impl PaginationState {
    pub fn new(position: PagePosition) -> Self {
        let mut seen_cursors = HashSet::new();
        if let PagePosition::Cursor(start) = &position {
            seen_cursors.insert(start.clone());
        }
        Self {
            position,
            seen_ids: HashSet::new(),
            seen_cursors,
            accumulated: 0,
            pages: 0,
        }
    }

    /// Move the records of one page into `out`, skipping identifiers already
    /// seen. Returns the number of records kept.
    pub fn absorb(
        &mut self,
        records: Vec<Record>,
        shape: &RecordShape,
        out: &mut Vec<Record>,
    ) -> usize {
        let before = out.len();
        for record in records {
            let Some(id) = shape.id_of(&record) else {
                log::warn!("Skipping record without '{}'", shape.id_field);
                continue;
            };
            if self.seen_ids.insert(id) {
                out.push(record);
            }
        }
        let kept = out.len() - before;
        self.accumulated += kept;
        kept
    }
}
