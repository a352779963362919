//! Silver v3: applies the reference corrections to the standardized table.
//!
//! For each corrected field, the `_std` value left-joins the correction
//! store within its field category; a hit substitutes the curated
//! `good_value`, a miss falls back to `_std` unchanged (the expected steady
//! state for most values). The `_clean_key` is then re-derived from the
//! post-substitution value, because a correction may reintroduce characters
//! (an accent, a period) that the generic key rule must still strip.
//!
//! Re-running the stage after the store gains entries recomputes the whole
//! table: previously fallen-back values pick up their new corrections.

use anyhow::{Result, bail};
use itertools::Itertools;
use log::info;

use crate::{
    canon,
    cli::ApplyArgs,
    fixes::{FixField, FixStore},
    layout,
    store::{Store, Table, WriteMode},
};

/// `(std source, clean target, clean-key target, category)` for the four
/// corrected fields, in output order.
const CORRECTIONS: &[(&str, &str, &str, FixField)] = &[
    (
        "order_country_std",
        "order_country_clean",
        "order_country_clean_key",
        FixField::Country,
    ),
    (
        "order_city_std",
        "order_city_clean",
        "order_city_clean_key",
        FixField::City,
    ),
    (
        "customer_country_std",
        "customer_country_clean",
        "customer_country_clean_key",
        FixField::Country,
    ),
    (
        "customer_city_std",
        "customer_city_clean",
        "customer_city_clean_key",
        FixField::City,
    ),
];

pub struct ApplyOutcome {
    pub table: Table,
    /// Rows where the correction actually fired (`clean != std`), per field.
    pub corrected: Vec<(&'static str, usize)>,
}

/// Builds the silver v3 table from v2 plus the correction store.
pub fn build_corrected(standardized: &Table, fixes: &FixStore) -> Result<ApplyOutcome> {
    let missing = CORRECTIONS
        .iter()
        .filter(|(source, _, _, _)| standardized.column_index(source).is_none())
        .map(|(source, _, _, _)| *source)
        .join(", ");
    if !missing.is_empty() {
        bail!("silver v2 table is missing column(s): {missing}");
    }

    let country_map = fixes.category_map(FixField::Country);
    let city_map = fixes.category_map(FixField::City);
    let plan = CORRECTIONS
        .iter()
        .map(|(source, _, _, field)| {
            let index = standardized.column_index(source).expect("checked above");
            let map = match field {
                FixField::Country => &country_map,
                FixField::City => &city_map,
            };
            (index, map)
        })
        .collect::<Vec<_>>();

    let mut columns = standardized.columns.clone();
    columns.extend(CORRECTIONS.iter().map(|(_, clean, _, _)| clean.to_string()));
    columns.extend(CORRECTIONS.iter().map(|(_, _, key, _)| key.to_string()));

    let mut corrected = CORRECTIONS
        .iter()
        .map(|(source, _, _, _)| (*source, 0usize))
        .collect::<Vec<_>>();
    let mut rows = Vec::with_capacity(standardized.len());
    for row in &standardized.rows {
        let mut out = row.clone();
        let mut clean_values = Vec::with_capacity(CORRECTIONS.len());
        for (spec_pos, (index, map)) in plan.iter().enumerate() {
            let std_value = row.get(*index).map(|c| c.as_str()).unwrap_or_default();
            let clean = match map.get(std_value) {
                Some(good) if !std_value.is_empty() => {
                    corrected[spec_pos].1 += 1;
                    (*good).to_string()
                }
                _ => std_value.to_string(),
            };
            clean_values.push(clean);
        }
        for clean in &clean_values {
            out.push(clean.clone());
        }
        for clean in &clean_values {
            let key = if clean.is_empty() {
                String::new()
            } else {
                canon::grouping_key(clean)
            };
            out.push(key);
        }
        rows.push(out);
    }

    Ok(ApplyOutcome {
        table: Table { columns, rows },
        corrected,
    })
}

pub fn execute(args: &ApplyArgs) -> Result<()> {
    let store = Store::open(&args.warehouse)?;
    let standardized = store.read(layout::SILVER_CLEAN_V2)?;
    let fixes = FixStore::load(&store)?;
    if fixes.is_empty() {
        info!("Correction store is empty; all values will fall back to their standardized form");
    }
    let outcome = build_corrected(&standardized, &fixes)?;
    store.write(layout::SILVER_CLEAN_V3, &outcome.table, WriteMode::CreateOrReplace)?;
    store.write_alias(layout::SILVER_CLEAN_CURRENT, layout::SILVER_CLEAN_V3)?;
    let summary = outcome
        .corrected
        .iter()
        .map(|(source, count)| format!("{source}={count}"))
        .join(", ");
    info!(
        "Applied {} correction entr(y/ies) across {} row(s) -> '{}' ({}); '{}' now points there",
        fixes.len(),
        outcome.table.len(),
        layout::SILVER_CLEAN_V3,
        summary,
        layout::SILVER_CLEAN_CURRENT
    );
    Ok(())
}
