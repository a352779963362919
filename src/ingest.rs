//! Bronze ingestion: source extract -> `bronze.dataco_supplychain_raw`.
//!
//! The extract is the one input that arrives from outside the warehouse, in
//! whatever delimiter and encoding the source system produced (the dataset's
//! mojibake is the fossil of a wrong-encoding decode upstream of us; we
//! decode faithfully and let the correction tiers repair the damage).
//! Business values pass through untouched; only the header row is rewritten
//! to cleaned, unique column names.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use encoding_rs_io::DecodeReaderBytesBuilder;
use log::info;

use crate::{
    cli::IngestArgs,
    columns,
    layout,
    store::{Store, Table, WriteMode},
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

/// Reads the whole extract into memory, transcoding to UTF-8 on the way in.
pub fn read_extract(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Table> {
    let file = File::open(path).with_context(|| format!("Opening extract {path:?}"))?;
    let decoder = DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .build(BufReader::new(file));
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(false)
        .from_reader(decoder);

    let columns = reader
        .headers()
        .context("Reading extract header row")?
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Reading extract row {}", idx + 2))?;
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }
    Ok(Table { columns, rows })
}

pub fn execute(args: &IngestArgs) -> Result<()> {
    let store = Store::open(&args.warehouse)?;
    let delimiter = resolve_delimiter(&args.input, args.delimiter);
    let encoding = resolve_encoding(args.input_encoding.as_deref())?;

    let extract = read_extract(&args.input, delimiter, encoding)
        .with_context(|| format!("Ingesting {:?}", args.input))?;
    let original_count = extract.columns.len();
    let cleaned = columns::clean_column_names(&extract.columns);
    let renamed = cleaned
        .iter()
        .zip(extract.columns.iter())
        .filter(|(clean, raw)| clean.as_str() != raw.as_str())
        .count();

    let bronze = Table {
        columns: cleaned,
        rows: extract.rows,
    };
    store.write(layout::BRONZE_RAW, &bronze, WriteMode::CreateOrReplace)?;
    info!(
        "Ingested {} row(s), {} column(s) ({} renamed) from {:?} -> '{}'",
        bronze.len(),
        original_count,
        renamed,
        args.input,
        layout::BRONZE_RAW
    );
    Ok(())
}
