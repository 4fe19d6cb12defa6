//! Record cleaning: flat records in, rectangular typed table out

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::DateTime;
use regex::Regex;
use serde_json::Value as Json;
use steamline_core::{Table, Value};

use crate::record::Record;

/// Characters outside the allow-list are stripped from text cells
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9\s\-.,!?]").expect("valid sanitize pattern"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Thresholds and column typing for [`clean`].
///
/// Column names ending in `*` match by prefix (`playtime_*`).
#[derive(Debug, Clone, PartialEq)]
pub struct CleanOptions {
    /// Rows with a smaller share of non-missing cells are dropped
    pub min_row_fill: f64,
    /// Columns with a larger share of missing cells are dropped
    pub max_column_missing: f64,
    pub integer_columns: Vec<String>,
    pub float_columns: Vec<String>,
    /// Unix seconds, converted to timestamps
    pub epoch_columns: Vec<String>,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            min_row_fill: 0.5,
            max_column_missing: 0.5,
            integer_columns: Vec::new(),
            float_columns: Vec::new(),
            epoch_columns: Vec::new(),
        }
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl CleanOptions {
    /// Typing of flattened Steam reviews
    pub fn steam_reviews() -> Self {
        Self {
            integer_columns: names(&[
                "recommendationid",
                "steamid",
                "num_games_owned",
                "num_reviews",
                "votes_up",
                "votes_funny",
                "comment_count",
                "playtime_*",
            ]),
            float_columns: names(&["weighted_vote_score"]),
            epoch_columns: names(&["timestamp_created", "timestamp_updated", "last_played"]),
            ..Default::default()
        }
    }

    /// Typing of the application catalog; incomplete rows are dropped
    pub fn steam_catalog() -> Self {
        Self {
            min_row_fill: 1.0,
            integer_columns: names(&["appid"]),
            ..Default::default()
        }
    }

    /// Same typing with thresholds taken from elsewhere (config)
    pub fn with_thresholds(mut self, min_row_fill: f64, max_column_missing: f64) -> Self {
        self.min_row_fill = min_row_fill;
        self.max_column_missing = max_column_missing;
        self
    }
}

fn matches_any(patterns: &[String], column: &str) -> bool {
    patterns.iter().any(|p| match p.strip_suffix('*') {
        Some(prefix) => column.starts_with(prefix),
        None => p == column,
    })
}

fn json_to_value(v: &Json) -> Value {
    match v {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map_or(Value::Null, Value::Float),
        },
        Json::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

/// Lay records out as a table. Columns appear in first-seen order; a field
/// missing from a record is `Null`.
pub fn records_to_table(records: &[Record]) -> Table {
    let mut columns: Vec<String> = Vec::new();
    let mut known: HashSet<&str> = HashSet::new();
    for record in records {
        for key in record.fields().keys() {
            if known.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }

    let mut table = Table::new(columns.clone());
    for record in records {
        let row = columns
            .iter()
            .map(|c| record.get(c).map_or(Value::Null, json_to_value))
            .collect();
        table.push_row(row);
    }
    table
}

/// Strip disallowed characters, collapse whitespace, lower-case.
/// Empty results become missing.
pub fn sanitize_text(s: &str) -> Option<String> {
    let stripped = DISALLOWED.replace_all(s, "");
    let collapsed = WHITESPACE.replace_all(&stripped, " ");
    let out = collapsed.trim().to_lowercase();
    (!out.is_empty()).then_some(out)
}

fn to_int(v: &Value) -> Value {
    match v {
        Value::Null | Value::Int(_) => v.clone(),
        Value::Bool(b) => Value::Int(i64::from(*b)),
        Value::Float(x) if x.is_finite() => Value::Int(*x as i64),
        Value::Text(s) => s
            .parse::<i64>()
            .ok()
            .or_else(|| s.parse::<f64>().ok().filter(|x| x.is_finite()).map(|x| x as i64))
            .map_or(Value::Int(0), Value::Int),
        _ => Value::Int(0),
    }
}

fn to_float(v: &Value) -> Value {
    match v {
        Value::Null | Value::Float(_) => v.clone(),
        Value::Int(n) => Value::Float(*n as f64),
        Value::Bool(b) => Value::Float(if *b { 1.0 } else { 0.0 }),
        Value::Text(s) => Value::Float(s.parse::<f64>().ok().filter(|x| x.is_finite()).unwrap_or(0.0)),
        Value::Timestamp(_) => Value::Float(0.0),
    }
}

/// Unix seconds to a UTC timestamp; unparseable or out of range is missing
fn to_timestamp(v: &Value) -> Value {
    let secs = match v {
        Value::Int(n) => Some(*n),
        Value::Float(x) if x.is_finite() => Some(*x as i64),
        Value::Text(s) => s.parse::<i64>().ok(),
        Value::Timestamp(_) => return v.clone(),
        _ => None,
    };
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
        .map_or(Value::Null, |dt| Value::Timestamp(dt.naive_utc()))
}

fn typed_columns(table: &Table, patterns: &[String]) -> Vec<String> {
    table
        .columns()
        .iter()
        .filter(|c| matches_any(patterns, c))
        .cloned()
        .collect()
}

/// Remove exact duplicate rows, keeping the first occurrence
pub fn dedupe_rows(table: &mut Table) -> usize {
    let before = table.len();
    let mut seen: HashSet<Vec<Value>> = HashSet::with_capacity(before);
    table.retain_rows(|row| seen.insert(row.clone()));
    before - table.len()
}

/// Clean an already tabulated set of records.
pub fn clean_table(mut table: Table, opts: &CleanOptions) -> Table {
    table.map_cells(|v| match v {
        Value::Text(s) => sanitize_text(s).map_or(Value::Null, Value::Text),
        other => other.clone(),
    });

    // Epoch columns are converted from integers, so they skip integer coercion
    for column in typed_columns(&table, &opts.integer_columns) {
        if !matches_any(&opts.epoch_columns, &column) {
            table.map_column(&column, to_int);
        }
    }
    for column in typed_columns(&table, &opts.float_columns) {
        table.map_column(&column, to_float);
    }
    for column in typed_columns(&table, &opts.epoch_columns) {
        table.map_column(&column, to_timestamp);
    }

    let rows = table.len();
    if rows > 0 {
        let missing: Vec<usize> = (0..table.columns().len())
            .map(|i| table.rows().iter().filter(|r| r[i].is_null()).count())
            .collect();
        let mut dropped = Vec::new();
        table.retain_columns(|i, name| {
            let keep = missing[i] as f64 / rows as f64 <= opts.max_column_missing;
            if !keep {
                dropped.push(name.to_string());
            }
            keep
        });
        if !dropped.is_empty() {
            log::debug!("Dropped sparse columns: {}", dropped.join(", "));
        }
    }

    let width = table.columns().len();
    if width > 0 {
        let before = table.len();
        table.retain_rows(|row| {
            let filled = row.iter().filter(|v| !v.is_null()).count();
            filled as f64 / width as f64 >= opts.min_row_fill
        });
        let dropped = before - table.len();
        if dropped > 0 {
            log::debug!("Dropped {dropped} sparse rows");
        }
    }

    let defaults: Vec<Value> = (0..width)
        .map(|i| table.column_kind(i).map_or(Value::Int(0), |k| k.default_value()))
        .collect();
    let columns: Vec<String> = table.columns().to_vec();
    for (column, default) in columns.iter().zip(defaults) {
        table.map_column(column, |v| if v.is_null() { default.clone() } else { v.clone() });
    }

    let removed = dedupe_rows(&mut table);
    if removed > 0 {
        log::debug!("Removed {removed} duplicate rows");
    }
    table
}

/// Turn flat records into a cleaned table.
pub fn clean(records: &[Record], opts: &CleanOptions) -> Table {
    clean_table(records_to_table(records), opts)
}
