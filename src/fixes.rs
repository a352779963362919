//! The curated reference-correction store (`silver.ref_text_fixes`).
//!
//! A small, human-maintained dictionary mapping observed corrupted text to
//! its correction, keyed by `(field category, bad value)`. The pipeline only
//! stores and applies entries; it never derives them. Upserts replace the
//! correction for an existing key in place, so reseeding the same batch is a
//! no-op. There is no delete: a stale entry whose bad value no longer occurs
//! simply stops matching.

use std::{collections::HashMap, fmt, path::Path, str::FromStr};

use anyhow::{Context, Result, anyhow};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    layout,
    store::{Store, Table, WriteMode},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixField {
    Country,
    City,
}

impl FixField {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixField::Country => "country",
            FixField::City => "city",
        }
    }
}

impl fmt::Display for FixField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FixField {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "country" => Ok(FixField::Country),
            "city" => Ok(FixField::City),
            other => Err(anyhow!(
                "unknown correction field '{other}' (expected 'country' or 'city')"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixEntry {
    pub field: FixField,
    pub bad_value: String,
    pub good_value: String,
}

/// In-memory view of the correction table. Entry order is insertion order,
/// preserved across save/load so curators see their batches where they left
/// them.
#[derive(Debug, Clone, Default)]
pub struct FixStore {
    entries: Vec<FixEntry>,
}

impl FixStore {
    /// Loads the store from the warehouse; an absent table is an empty
    /// store, not an error (first run seeds it).
    pub fn load(store: &Store) -> Result<Self> {
        if !store.exists(layout::SILVER_REF_TEXT_FIXES) {
            return Ok(FixStore::default());
        }
        let table = store.read(layout::SILVER_REF_TEXT_FIXES)?;
        let field_idx = table.require_column("field")?;
        let bad_idx = table.require_column("bad_value")?;
        let good_idx = table.require_column("good_value")?;
        let mut entries = Vec::with_capacity(table.len());
        for (row_no, row) in table.rows.iter().enumerate() {
            let field: FixField = row[field_idx]
                .parse()
                .with_context(|| format!("Correction entry on row {}", row_no + 2))?;
            entries.push(FixEntry {
                field,
                bad_value: row[bad_idx].clone(),
                good_value: row[good_idx].clone(),
            });
        }
        Ok(FixStore { entries })
    }

    pub fn save(&self, store: &Store) -> Result<()> {
        let mut table = Table::new(vec![
            "field".to_string(),
            "bad_value".to_string(),
            "good_value".to_string(),
        ]);
        for entry in &self.entries {
            table.rows.push(vec![
                entry.field.as_str().to_string(),
                entry.bad_value.clone(),
                entry.good_value.clone(),
            ]);
        }
        store.write(layout::SILVER_REF_TEXT_FIXES, &table, WriteMode::CreateOrReplace)
    }

    /// Inserts or replaces the correction for `(field, bad_value)`.
    /// Returns `true` when a new entry was inserted, `false` on update.
    pub fn upsert(&mut self, field: FixField, bad_value: &str, good_value: &str) -> bool {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.field == field && e.bad_value == bad_value)
        {
            existing.good_value = good_value.to_string();
            false
        } else {
            self.entries.push(FixEntry {
                field,
                bad_value: bad_value.to_string(),
                good_value: good_value.to_string(),
            });
            true
        }
    }

    /// Exact-match lookup; `None` means fall back to the uncorrected value.
    pub fn lookup(&self, field: FixField, value: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.field == field && e.bad_value == value)
            .map(|e| e.good_value.as_str())
    }

    /// Borrowed bad-to-good map for one field category; the mapping stage
    /// joins whole columns against this instead of probing entry by entry.
    pub fn category_map(&self, field: FixField) -> HashMap<&str, &str> {
        self.entries
            .iter()
            .filter(|e| e.field == field)
            .map(|e| (e.bad_value.as_str(), e.good_value.as_str()))
            .collect()
    }

    pub fn entries(&self) -> &[FixEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merges a curated seed batch, counting inserts vs updates.
    pub fn merge(&mut self, batch: &[FixEntry]) -> (usize, usize) {
        let mut inserted = 0usize;
        let mut updated = 0usize;
        for entry in batch {
            if self.upsert(entry.field, &entry.bad_value, &entry.good_value) {
                inserted += 1;
            } else {
                updated += 1;
            }
        }
        (inserted, updated)
    }
}

/// Reads a curated YAML seed file: a sequence of
/// `{field, bad_value, good_value}` mappings.
pub fn load_seed_file(path: &Path) -> Result<Vec<FixEntry>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Reading correction seed file {path:?}"))?;
    let entries: Vec<FixEntry> =
        serde_yaml::from_str(&raw).with_context(|| format!("Parsing seed file {path:?}"))?;
    Ok(entries)
}

/// Parses a `field:bad=good` upsert directive from the command line.
pub fn parse_upsert_directive(spec: &str) -> Result<FixEntry> {
    let (field, rest) = spec
        .split_once(':')
        .ok_or_else(|| anyhow!("Correction '{spec}' is missing the 'field:' prefix"))?;
    let (bad_value, good_value) = rest
        .split_once('=')
        .ok_or_else(|| anyhow!("Correction '{spec}' must look like field:bad=good"))?;
    if bad_value.is_empty() {
        return Err(anyhow!("Correction '{spec}' has an empty bad value"));
    }
    Ok(FixEntry {
        field: field.parse()?,
        bad_value: bad_value.to_string(),
        good_value: good_value.to_string(),
    })
}

pub fn execute(args: &crate::cli::FixesArgs) -> Result<()> {
    let store = Store::open(&args.warehouse)?;
    let mut fixes = FixStore::load(&store)?;

    let mut changed = false;
    if let Some(seed) = &args.seed {
        let batch = load_seed_file(seed)?;
        let (inserted, updated) = fixes.merge(&batch);
        info!(
            "Seeded {} correction(s) from {:?} ({} inserted, {} updated)",
            batch.len(),
            seed,
            inserted,
            updated
        );
        changed = true;
    }
    for spec in &args.upsert {
        let entry = parse_upsert_directive(spec)?;
        let inserted = fixes.upsert(entry.field, &entry.bad_value, &entry.good_value);
        info!(
            "{} correction {}:'{}' -> '{}'",
            if inserted { "Inserted" } else { "Updated" },
            entry.field,
            entry.bad_value,
            entry.good_value
        );
        changed = true;
    }
    if changed {
        fixes.save(&store)?;
    }

    if args.list {
        let rows = fixes
            .entries()
            .iter()
            .map(|e| {
                vec![
                    e.field.to_string(),
                    e.bad_value.clone(),
                    e.good_value.clone(),
                ]
            })
            .collect::<Vec<_>>();
        crate::report::print_table(&["field", "bad_value", "good_value"], &rows);
    }
    if !changed && !args.list {
        info!(
            "Correction store holds {} entr(y/ies); nothing to do",
            fixes.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_twice_with_identical_arguments_keeps_one_entry() {
        let mut fixes = FixStore::default();
        assert!(fixes.upsert(FixField::Country, "M\u{fffd}xico", "Mexico"));
        assert!(!fixes.upsert(FixField::Country, "M\u{fffd}xico", "Mexico"));
        assert_eq!(fixes.len(), 1);
        assert_eq!(fixes.lookup(FixField::Country, "M\u{fffd}xico"), Some("Mexico"));
    }

    #[test]
    fn upsert_replaces_the_correction_in_place() {
        let mut fixes = FixStore::default();
        fixes.upsert(FixField::City, "Berl\u{fffd}n", "Berlin");
        fixes.upsert(FixField::City, "Berl\u{fffd}n", "Berlín");
        assert_eq!(fixes.len(), 1);
        assert_eq!(fixes.lookup(FixField::City, "Berl\u{fffd}n"), Some("Berlín"));
    }

    #[test]
    fn lookup_is_scoped_by_field_category() {
        let mut fixes = FixStore::default();
        fixes.upsert(FixField::Country, "L\u{fffd}bano", "Libano");
        assert_eq!(fixes.lookup(FixField::City, "L\u{fffd}bano"), None);
        assert_eq!(fixes.lookup(FixField::Country, "L\u{fffd}bano"), Some("Libano"));
    }

    #[test]
    fn upsert_directive_parses_field_bad_and_good() {
        let entry = parse_upsert_directive("country:Espa\u{fffd}a=Espana").expect("parse");
        assert_eq!(entry.field, FixField::Country);
        assert_eq!(entry.bad_value, "Espa\u{fffd}a");
        assert_eq!(entry.good_value, "Espana");

        assert!(parse_upsert_directive("nonsense").is_err());
        assert!(parse_upsert_directive("region:a=b").is_err());
    }

    #[test]
    fn save_and_load_round_trip_preserves_order() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = Store::open(dir.path()).expect("open store");
        let mut fixes = FixStore::default();
        fixes.upsert(FixField::Country, "Per\u{fffd}", "Peru");
        fixes.upsert(FixField::City, "Bogot\u{fffd}", "Bogotá");
        fixes.save(&store).expect("save");

        let reloaded = FixStore::load(&store).expect("load");
        assert_eq!(reloaded.entries(), fixes.entries());
    }
}
