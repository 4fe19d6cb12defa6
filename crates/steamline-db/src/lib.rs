//! steamline-db: DuckDB persistence for cleaned storefront tables
//!
//! Tables arrive as [`steamline_core::Table`] values and are written either
//! wholesale (`replace`) or incrementally with key-based deduplication
//! (`append`). Any stored table can be exported to CSV.

mod sql;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use duckdb::{Connection, params_from_iter};
use steamline_core::Table;

/// An open DuckDB database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database file.
    pub fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database dir: {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        log::debug!("Opened database {}", path.display());
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open DuckDB in-memory connection")?;
        Ok(Self { conn })
    }

    /// Underlying connection, for ad-hoc queries
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.table_names()?.iter().any(|t| t == name))
    }

    /// Drop `name` and recreate it from `table`. Returns rows written.
    pub fn replace(&mut self, name: &str, table: &Table) -> Result<usize> {
        if table.columns().is_empty() {
            log::warn!("{name}: nothing to write, table has no columns");
            return Ok(0);
        }
        let tx = self.conn.transaction().context("Failed to begin transaction")?;
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", sql::ident(name)))
            .with_context(|| format!("Failed to drop table {name}"))?;
        tx.execute_batch(&sql::create_table(name, table, false))
            .with_context(|| format!("Failed to create table {name}"))?;
        let written = insert_rows(&tx, name, table)?;
        tx.commit()
            .with_context(|| format!("Failed to commit table {name}"))?;

        log::info!("Replaced {name} with {written} rows");
        Ok(written)
    }

    /// Add rows to `name`, creating it if needed. With `dedupe_key`, rows
    /// whose key is already stored (or repeated in the batch) are skipped.
    /// Returns rows inserted.
    pub fn append(&mut self, name: &str, table: &Table, dedupe_key: Option<&str>) -> Result<usize> {
        if table.is_empty() {
            log::debug!("{name}: no rows to append");
            return Ok(0);
        }
        if let Some(key) = dedupe_key {
            anyhow::ensure!(
                table.has_column(key),
                "Cannot append to {name}: key column '{key}' is missing"
            );
        }

        if self.table_exists(name)? {
            self.add_missing_columns(name, table)?;
        }

        let staging = format!("_staging_{name}");
        let tx = self.conn.transaction().context("Failed to begin transaction")?;
        tx.execute_batch(&sql::create_table(name, table, true))
            .with_context(|| format!("Failed to create table {name}"))?;
        tx.execute_batch(&sql::create_staging(&staging, table))
            .context("Failed to create staging table")?;
        insert_rows(&tx, &staging, table)?;

        let inserted = tx
            .execute(&sql::merge_staged(name, &staging, dedupe_key), [])
            .with_context(|| format!("Failed to merge rows into {name}"))?;
        tx.execute_batch(&format!("DROP TABLE {}", sql::ident(&staging)))
            .context("Failed to drop staging table")?;
        tx.commit()
            .with_context(|| format!("Failed to commit table {name}"))?;

        log::info!(
            "Appended {inserted} of {} rows to {name}",
            table.len()
        );
        Ok(inserted)
    }

    /// Write each existing table in `tables` to `<dir>/<table>.csv`.
    pub fn export_csv(&self, tables: &[&str], dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output dir: {}", dir.display()))?;
        let existing = self.table_names()?;

        let mut written = Vec::new();
        for &table in tables {
            if !existing.iter().any(|t| t == table) {
                log::warn!("Skipping export of {table}: table does not exist");
                continue;
            }
            let path = dir.join(format!("{table}.csv"));
            self.conn
                .execute_batch(&sql::copy_to_csv(table, &path))
                .with_context(|| format!("Failed to export {table} to {}", path.display()))?;
            log::info!("Exported {table} -> {}", path.display());
            written.push(path);
        }
        Ok(written)
    }

    pub fn count(&self, name: &str) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", sql::ident(name)), [], |row| {
                row.get(0)
            })
            .with_context(|| format!("Failed to count rows of {name}"))?;
        Ok(n as u64)
    }

    /// Row count of every stored table, by name
    pub fn table_counts(&self) -> Result<Vec<(String, u64)>> {
        self.table_names()?
            .into_iter()
            .map(|name| {
                let n = self.count(&name)?;
                Ok((name, n))
            })
            .collect()
    }

    /// Widen `name` with columns that only `table` has
    fn add_missing_columns(&self, name: &str, table: &Table) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare(sql::LIST_COLUMNS)
            .context("Failed to list columns")?;
        let existing = stmt
            .query_map(duckdb::params![name], |row| row.get::<_, String>(0))
            .context("Failed to list columns")?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read column names")?;

        for (column, ty) in sql::column_types(table) {
            if existing.contains(&column) {
                continue;
            }
            log::info!("{name}: adding column {column} {ty}");
            self.conn
                .execute_batch(&sql::add_column(name, &column, ty))
                .with_context(|| format!("Failed to add column {column} to {name}"))?;
        }
        Ok(())
    }

    fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(sql::LIST_TABLES)
            .context("Failed to list tables")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("Failed to list tables")?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read table names")?;
        Ok(names)
    }
}

fn insert_rows(conn: &Connection, name: &str, table: &Table) -> Result<usize> {
    let mut stmt = conn
        .prepare(&sql::insert_row(name, table))
        .with_context(|| format!("Failed to prepare insert into {name}"))?;
    for row in table.rows() {
        stmt.execute(params_from_iter(row.iter().map(sql::to_sql)))
            .with_context(|| format!("Failed to insert row into {name}"))?;
    }
    Ok(table.len())
}
