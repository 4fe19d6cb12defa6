//! SQL generation and value binding for table persistence.

use std::path::Path;

use chrono::NaiveDateTime;
use duckdb::types::Value as SqlValue;
use steamline_core::{Table, Value, ValueKind};

/// Quote an identifier for DuckDB.
pub fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal (used for file paths in COPY).
pub fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Column type for values of `kind`. Columns without any value are VARCHAR.
pub fn sql_type(kind: Option<ValueKind>) -> &'static str {
    match kind {
        Some(ValueKind::Bool) => "BOOLEAN",
        Some(ValueKind::Int) => "BIGINT",
        Some(ValueKind::Float) => "DOUBLE",
        Some(ValueKind::Timestamp) => "TIMESTAMP",
        Some(ValueKind::Text) | None => "VARCHAR",
    }
}

/// `(name, type)` per column, typed from the first non-null value
pub fn column_types(table: &Table) -> Vec<(String, &'static str)> {
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, c)| (c.clone(), sql_type(table.column_kind(i))))
        .collect()
}

pub fn create_table(name: &str, table: &Table, if_not_exists: bool) -> String {
    let cols = column_types(table)
        .iter()
        .map(|(c, t)| format!("{} {t}", ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
    let guard = if if_not_exists { "IF NOT EXISTS " } else { "" };
    format!("CREATE TABLE {guard}{} ({cols})", ident(name))
}

pub fn create_staging(name: &str, table: &Table) -> String {
    let cols = column_types(table)
        .iter()
        .map(|(c, t)| format!("{} {t}", ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE OR REPLACE TEMP TABLE {} ({cols})", ident(name))
}

pub fn add_column(table: &str, column: &str, ty: &str) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {ty}",
        ident(table),
        ident(column)
    )
}

pub fn insert_row(name: &str, table: &Table) -> String {
    let cols = table
        .columns()
        .iter()
        .map(|c| ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let params = vec!["?"; table.columns().len()].join(", ");
    format!("INSERT INTO {} ({cols}) VALUES ({params})", ident(name))
}

/// Move staged rows into `target`. With a key, rows whose key is already in
/// the target are skipped, and only the first staged row per key within the
/// batch is kept (staging `rowid` follows insertion order).
pub fn merge_staged(target: &str, staging: &str, key: Option<&str>) -> String {
    let (t, s) = (ident(target), ident(staging));
    match key {
        Some(key) => {
            let k = ident(key);
            format!(
                "INSERT INTO {t} BY NAME \
                 SELECT * FROM {s} AS s \
                 WHERE s.{k} IS NOT NULL \
                   AND NOT EXISTS (SELECT 1 FROM {t} AS t WHERE t.{k} = s.{k}) \
                 QUALIFY ROW_NUMBER() OVER (PARTITION BY s.{k} ORDER BY s.rowid) = 1"
            )
        }
        None => format!("INSERT INTO {t} BY NAME SELECT * FROM {s}"),
    }
}

pub fn copy_to_csv(table: &str, path: &Path) -> String {
    format!(
        "COPY {} TO {} (FORMAT CSV, HEADER)",
        ident(table),
        literal(&path.to_string_lossy())
    )
}

pub const LIST_TABLES: &str = "SELECT table_name FROM information_schema.tables \
     WHERE table_schema = 'main' AND table_type = 'BASE TABLE' \
     ORDER BY table_name";

pub const LIST_COLUMNS: &str = "SELECT column_name FROM information_schema.columns \
     WHERE table_schema = 'main' AND table_name = ? \
     ORDER BY ordinal_position";

fn timestamp_text(t: &NaiveDateTime) -> String {
    t.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

/// Bindable parameter for one cell. Timestamps are bound as text and cast
/// by the TIMESTAMP column on insert.
pub fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Boolean(*b),
        Value::Int(n) => SqlValue::BigInt(*n),
        Value::Float(x) => SqlValue::Double(*x),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Timestamp(t) => SqlValue::Text(timestamp_text(t)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut t = Table::new(vec!["appid".into(), "name".into(), "score".into()]);
        t.push_row(vec![Value::Int(10), Value::Null, Value::Float(0.5)]);
        t.push_row(vec![Value::Int(20), "portal".into(), Value::Null]);
        t
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(ident("games"), "\"games\"");
        assert_eq!(ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(literal("it's"), "'it''s'");
    }

    #[test]
    fn types_from_first_non_null() {
        let types = column_types(&sample());
        assert_eq!(
            types,
            vec![
                ("appid".to_string(), "BIGINT"),
                ("name".to_string(), "VARCHAR"),
                ("score".to_string(), "DOUBLE"),
            ]
        );
    }

    #[test]
    fn create_and_insert_statements() {
        let t = sample();
        assert_eq!(
            create_table("games", &t, false),
            "CREATE TABLE \"games\" (\"appid\" BIGINT, \"name\" VARCHAR, \"score\" DOUBLE)"
        );
        assert_eq!(
            insert_row("games", &t),
            "INSERT INTO \"games\" (\"appid\", \"name\", \"score\") VALUES (?, ?, ?)"
        );
    }

    #[test]
    fn merge_without_key_copies_everything() {
        assert_eq!(
            merge_staged("users", "_stage", None),
            "INSERT INTO \"users\" BY NAME SELECT * FROM \"_stage\""
        );
    }

    #[test]
    fn merge_with_key_filters_existing_and_batch_duplicates() {
        let sql = merge_staged("users", "_stage", Some("steamid"));
        assert!(sql.contains("NOT EXISTS"));
        assert!(sql.contains("QUALIFY ROW_NUMBER() OVER (PARTITION BY s.\"steamid\" ORDER BY s.rowid) = 1"));
    }

    #[test]
    fn timestamps_bind_as_text() {
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(
            to_sql(&Value::Timestamp(ts)),
            SqlValue::Text("2024-01-02 03:04:05".to_string())
        );
    }
}
