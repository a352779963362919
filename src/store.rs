//! Directory-backed warehouse of UTF-8 CSV tables.
//!
//! A logical table `tier.name` lives at `<root>/tier.name.csv`. Writes are
//! whole-table replacements staged through a temp file and renamed into
//! place, so readers never observe a partial table. An `<alias>.alias`
//! pointer file stands in for `CREATE OR REPLACE VIEW`: reads resolve one
//! level of indirection, letting consumers follow `..._current` without
//! knowing which version it names.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use csv::QuoteStyle;
use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("table '{0}' does not exist in the warehouse")]
    TableNotFound(String),
    #[error("alias '{alias}' points at missing table '{target}'")]
    DanglingAlias { alias: String, target: String },
}

/// Whole-table replace semantics. The two variants mirror the two write
/// surfaces of the original store (dataframe `mode("overwrite")` vs SQL
/// `CREATE OR REPLACE TABLE`); both create the table when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Overwrite,
    CreateOrReplace,
}

/// An in-memory rowset. Cells are strings; the empty string encodes NULL.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
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

    /// Index of a column the caller cannot proceed without.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| anyhow::anyhow!("column '{name}' not found in table"))
    }

    /// Iterates the cells of one column.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows.iter().map(move |row| {
            row.get(index).map(|cell| cell.as_str()).unwrap_or_default()
        })
    }
}

pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Opens (creating if needed) a warehouse rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Creating warehouse directory {root:?}"))?;
        Ok(Store { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.csv"))
    }

    fn alias_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.alias"))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.table_path(name).is_file() || self.alias_path(name).is_file()
    }

    /// Follows at most one alias hop and returns the physical table name.
    pub fn resolve(&self, name: &str) -> Result<String> {
        let alias_path = self.alias_path(name);
        if !alias_path.is_file() {
            return Ok(name.to_string());
        }
        let target = fs::read_to_string(&alias_path)
            .with_context(|| format!("Reading alias file {alias_path:?}"))?;
        let target = target.trim().to_string();
        if !self.table_path(&target).is_file() {
            return Err(StoreError::DanglingAlias {
                alias: name.to_string(),
                target,
            }
            .into());
        }
        Ok(target)
    }

    /// Full scan of a table (resolving aliases).
    pub fn read(&self, name: &str) -> Result<Table> {
        let physical = self.resolve(name)?;
        let path = self.table_path(&physical);
        if !path.is_file() {
            return Err(StoreError::TableNotFound(name.to_string()).into());
        }
        let file = File::open(&path).with_context(|| format!("Opening table file {path:?}"))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(BufReader::new(file));
        let columns = reader
            .headers()
            .with_context(|| format!("Reading header of table '{name}'"))?
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>();
        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record =
                record.with_context(|| format!("Reading row {} of table '{name}'", idx + 2))?;
            rows.push(record.iter().map(|cell| cell.to_string()).collect());
        }
        debug!("Read {} row(s) from '{name}'", rows.len());
        Ok(Table { columns, rows })
    }

    /// Atomic whole-table replace: stage to `<name>.csv.tmp`, then rename.
    pub fn write(&self, name: &str, table: &Table, mode: WriteMode) -> Result<()> {
        let path = self.table_path(name);
        let staging = self.root.join(format!("{name}.csv.tmp"));
        {
            let file = File::create(&staging)
                .with_context(|| format!("Creating staging file {staging:?}"))?;
            let mut writer = csv::WriterBuilder::new()
                .quote_style(QuoteStyle::Always)
                .from_writer(BufWriter::new(file));
            writer
                .write_record(&table.columns)
                .with_context(|| format!("Writing header of table '{name}'"))?;
            for (idx, row) in table.rows.iter().enumerate() {
                writer
                    .write_record(row)
                    .with_context(|| format!("Writing row {} of table '{name}'", idx + 2))?;
            }
            writer
                .flush()
                .with_context(|| format!("Flushing table '{name}'"))?;
        }
        fs::rename(&staging, &path)
            .with_context(|| format!("Publishing table '{name}' to {path:?}"))?;
        debug!(
            "Wrote {} row(s) to '{name}' ({mode:?})",
            table.rows.len()
        );
        Ok(())
    }

    /// Repoints `alias` at `target`, replacing any previous pointer.
    pub fn write_alias(&self, alias: &str, target: &str) -> Result<()> {
        if !self.table_path(target).is_file() {
            return Err(StoreError::TableNotFound(target.to_string()).into());
        }
        let path = self.alias_path(alias);
        let mut file =
            File::create(&path).with_context(|| format!("Creating alias file {path:?}"))?;
        writeln!(file, "{target}").with_context(|| format!("Writing alias '{alias}'"))?;
        debug!("Alias '{alias}' -> '{target}'");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_table() -> Table {
        Table {
            columns: vec!["id".to_string(), "name".to_string()],
            rows: vec![
                vec!["1".to_string(), "uno".to_string()],
                vec!["2".to_string(), String::new()],
            ],
        }
    }

    #[test]
    fn write_then_read_round_trips_including_nulls() {
        let dir = tempdir().expect("temp dir");
        let store = Store::open(dir.path()).expect("open store");
        let table = sample_table();
        store
            .write("bronze.things", &table, WriteMode::CreateOrReplace)
            .expect("write");
        let back = store.read("bronze.things").expect("read");
        assert_eq!(back, table);
    }

    #[test]
    fn overwrite_replaces_the_whole_table() {
        let dir = tempdir().expect("temp dir");
        let store = Store::open(dir.path()).expect("open store");
        store
            .write("t", &sample_table(), WriteMode::CreateOrReplace)
            .expect("first write");
        let smaller = Table {
            columns: vec!["id".to_string()],
            rows: vec![vec!["9".to_string()]],
        };
        store
            .write("t", &smaller, WriteMode::Overwrite)
            .expect("second write");
        assert_eq!(store.read("t").expect("read"), smaller);
    }

    #[test]
    fn missing_table_is_a_typed_error() {
        let dir = tempdir().expect("temp dir");
        let store = Store::open(dir.path()).expect("open store");
        let err = store.read("gold.nowhere").expect_err("should fail");
        let store_err = err.downcast_ref::<StoreError>().expect("store error");
        assert!(matches!(store_err, StoreError::TableNotFound(_)));
    }

    #[test]
    fn alias_resolves_to_current_target() {
        let dir = tempdir().expect("temp dir");
        let store = Store::open(dir.path()).expect("open store");
        store
            .write("silver.v1", &sample_table(), WriteMode::CreateOrReplace)
            .expect("write v1");
        let v2 = Table {
            columns: vec!["id".to_string()],
            rows: vec![vec!["3".to_string()]],
        };
        store
            .write("silver.v2", &v2, WriteMode::CreateOrReplace)
            .expect("write v2");
        store.write_alias("silver.current", "silver.v1").expect("alias v1");
        store.write_alias("silver.current", "silver.v2").expect("alias v2");
        assert_eq!(store.read("silver.current").expect("read"), v2);
    }

    #[test]
    fn alias_to_missing_table_is_rejected() {
        let dir = tempdir().expect("temp dir");
        let store = Store::open(dir.path()).expect("open store");
        assert!(store.write_alias("a", "missing").is_err());
    }
}
