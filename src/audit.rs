//! Ingestion audit: stamps provenance onto the bronze rows.
//!
//! Appends `_ingest_ts` and `_batch_id` to every row of the raw table and
//! publishes the result as `bronze.dataco_supplychain_raw_audited`. No
//! business field is read or altered; each run wholly supersedes the
//! previous audited snapshot.

use anyhow::Result;
use chrono::Utc;
use log::info;
use uuid::Uuid;

use crate::{
    cli::AuditArgs,
    data::TIMESTAMP_FORMAT,
    layout,
    store::{Store, Table, WriteMode},
};

pub const INGEST_TS_COLUMN: &str = "_ingest_ts";
pub const BATCH_ID_COLUMN: &str = "_batch_id";

/// Run identifier used when the caller does not supply one: stable within
/// the invocation, distinguishable across invocations.
pub fn default_batch_id() -> String {
    format!("batch_{}", Uuid::new_v4().simple())
}

/// Pure stamping step: every input field preserved unchanged, two
/// provenance columns appended.
pub fn stamp(raw: &Table, ingest_ts: &str, batch_id: &str) -> Table {
    let mut columns = raw.columns.clone();
    columns.push(INGEST_TS_COLUMN.to_string());
    columns.push(BATCH_ID_COLUMN.to_string());
    let rows = raw
        .rows
        .iter()
        .map(|row| {
            let mut stamped = row.clone();
            stamped.push(ingest_ts.to_string());
            stamped.push(batch_id.to_string());
            stamped
        })
        .collect();
    Table { columns, rows }
}

pub fn execute(args: &AuditArgs) -> Result<()> {
    let store = Store::open(&args.warehouse)?;
    let raw = store.read(layout::BRONZE_RAW)?;

    let batch_id = args.batch_id.clone().unwrap_or_else(default_batch_id);
    let ingest_ts = Utc::now().format(TIMESTAMP_FORMAT).to_string();
    let audited = stamp(&raw, &ingest_ts, &batch_id);

    store.write(layout::BRONZE_AUDITED, &audited, WriteMode::Overwrite)?;
    info!(
        "Audited {} row(s) under batch '{}' -> '{}'",
        audited.len(),
        batch_id,
        layout::BRONZE_AUDITED
    );
    Ok(())
}
