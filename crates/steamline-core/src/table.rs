//! Rectangular table handed from the transform stage to persistence

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::NaiveDateTime;

/// One cell value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

/// Type of a non-null [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    Timestamp,
}

impl ValueKind {
    /// Zero/default used when filling missing cells of this kind
    pub fn default_value(self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Int => Value::Int(0),
            Self::Float => Value::Float(0.0),
            Self::Text => Value::Text(String::new()),
            Self::Timestamp => Value::Timestamp(NaiveDateTime::default()),
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueKind::Bool),
            Self::Int(_) => Some(ValueKind::Int),
            Self::Float(_) => Some(ValueKind::Float),
            Self::Text(_) => Some(ValueKind::Text),
            Self::Timestamp(_) => Some(ValueKind::Timestamp),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }
}

// Floats compare by bit pattern so rows can be hashed for duplicate removal
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Int(n) => n.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::Text(s) => s.hash(state),
            Self::Timestamp(t) => t.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Timestamp(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Named columns plus rows of equal width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with `Null`, long rows truncated.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Kind of the first non-null value in column `idx`
    pub fn column_kind(&self, idx: usize) -> Option<ValueKind> {
        self.rows.iter().find_map(|row| row[idx].kind())
    }

    /// Cell lookup by row number and column name
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Add a column holding `value` in every row; replaces an existing one.
    pub fn set_constant_column(&mut self, name: &str, value: Value) {
        match self.column_index(name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.clone();
                }
            }
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(value.clone());
                }
            }
        }
    }

    /// Rewrite every cell of a column in place. Returns false if absent.
    pub fn map_column(&mut self, name: &str, mut f: impl FnMut(&Value) -> Value) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        true
    }

    /// Rewrite every cell of the table in place
    pub fn map_cells(&mut self, mut f: impl FnMut(&Value) -> Value) {
        for cell in self.rows.iter_mut().flatten() {
            *cell = f(cell);
        }
    }

    /// Keep columns for which `keep(index, name)` holds
    pub fn retain_columns(&mut self, mut keep: impl FnMut(usize, &str) -> bool) {
        let mask: Vec<bool> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| keep(i, c))
            .collect();
        let mut i = 0;
        self.columns.retain(|_| {
            i += 1;
            mask[i - 1]
        });
        for row in &mut self.rows {
            let mut i = 0;
            row.retain(|_| {
                i += 1;
                mask[i - 1]
            });
        }
    }

    pub fn retain_rows(&mut self, keep: impl FnMut(&Vec<Value>) -> bool) {
        self.rows.retain(keep);
    }

    /// New table with the named columns, in the given order. Names that are
    /// not present are skipped.
    pub fn select(&self, names: &[&str]) -> Table {
        let picked: Vec<(usize, &str)> = names
            .iter()
            .filter_map(|n| self.column_index(n).map(|i| (i, *n)))
            .collect();
        Table {
            columns: picked.iter().map(|(_, n)| n.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| picked.iter().map(|(i, _)| row[*i].clone()).collect())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use std::collections::HashSet;

    fn sample() -> Table {
        let mut t = Table::new(vec!["id".into(), "name".into(), "score".into()]);
        t.push_row(vec![Value::Int(1), "a".into(), Value::Float(0.5)]);
        t.push_row(vec![Value::Int(2), Value::Null, Value::Float(1.5)]);
        t
    }

    #[test]
    fn push_row_pads_and_truncates() {
        let mut t = Table::new(vec!["a".into(), "b".into()]);
        t.push_row(vec![Value::Int(1)]);
        t.push_row(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(t.rows()[0], vec![Value::Int(1), Value::Null]);
        assert_eq!(t.rows()[1].len(), 2);
    }

    #[test]
    fn column_kind_skips_nulls() {
        let t = sample();
        assert_eq!(t.column_kind(1), Some(ValueKind::Text));
        assert_eq!(t.column_kind(2), Some(ValueKind::Float));
    }

    #[test]
    fn select_reorders_and_skips_missing() {
        let t = sample().select(&["score", "missing", "id"]);
        assert_eq!(t.columns(), ["score", "id"]);
        assert_eq!(t.rows()[1], vec![Value::Float(1.5), Value::Int(2)]);
    }

    #[test]
    fn constant_column_added_and_replaced() {
        let mut t = sample();
        t.set_constant_column("appid", Value::Int(730));
        assert_eq!(t.get(1, "appid"), Some(&Value::Int(730)));
        t.set_constant_column("appid", Value::Int(440));
        assert_eq!(t.columns().len(), 4);
        assert_eq!(t.get(0, "appid"), Some(&Value::Int(440)));
    }

    #[test]
    fn retain_columns_keeps_rows_aligned() {
        let mut t = sample();
        t.retain_columns(|_, name| name != "name");
        assert_eq!(t.columns(), ["id", "score"]);
        assert_eq!(t.rows()[0], vec![Value::Int(1), Value::Float(0.5)]);
    }

    #[test]
    fn map_column_missing_returns_false() {
        let mut t = sample();
        assert!(!t.map_column("nope", |v| v.clone()));
        assert!(t.map_column("id", |v| Value::Int(v.as_i64().unwrap() * 10)));
        assert_eq!(t.get(1, "id"), Some(&Value::Int(20)));
    }

    #[test]
    fn float_values_hash_by_bits() {
        let mut set = HashSet::new();
        set.insert(vec![Value::Float(0.1), Value::Null]);
        set.insert(vec![Value::Float(0.1), Value::Null]);
        set.insert(vec![Value::Float(0.2), Value::Null]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display_timestamp() {
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap().naive_utc();
        assert_eq!(Value::Timestamp(ts).to_string(), "2023-11-14 22:13:20");
        assert_eq!(Value::Null.to_string(), "");
    }

    #[test]
    fn default_values_by_kind() {
        assert_eq!(ValueKind::Int.default_value(), Value::Int(0));
        assert_eq!(ValueKind::Text.default_value(), Value::Text(String::new()));
        assert_eq!(ValueKind::Bool.default_value(), Value::Bool(false));
    }
}
