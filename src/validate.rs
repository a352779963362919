//! Cross-tier data-quality validation.
//!
//! The pipeline's contract is "complete the batch, then measure": almost
//! everything here is a metric, rendered for a human or emitted as JSON.
//! Only structural breakage fails the command — row-count drift between
//! tiers, a violated `order_item_id` grain, or an unresolvable foreign key
//! in the gold layer. Everything else (parse nulls, leftover corruption,
//! commercial oddities) is evidence for the curator, not an error.

use anyhow::{Context, Result, bail};
use log::info;
use serde::Serialize;

use crate::{
    cli::ValidateArgs,
    data,
    layout,
    report,
    star::{self, StarReport},
    store::{Store, Table},
};

/// Marker left behind by a wrong-encoding decode somewhere upstream.
const CORRUPTION_MARKER: char = '\u{fffd}';

#[derive(Debug, Serialize)]
pub struct RowCounts {
    pub bronze_audited: usize,
    pub silver_v1: usize,
    pub silver_v2: usize,
    pub silver_v3: usize,
}

impl RowCounts {
    /// No stage may drop or duplicate rows.
    pub fn preserved(&self) -> bool {
        self.silver_v1 == self.bronze_audited
            && self.silver_v2 == self.bronze_audited
            && self.silver_v3 == self.bronze_audited
    }
}

#[derive(Debug, Serialize)]
pub struct TimestampNulls {
    pub order_ts_nulls: usize,
    pub ship_ts_nulls: usize,
}

#[derive(Debug, Serialize)]
pub struct KeyNulls {
    pub order_item_id: usize,
    pub order_id: usize,
    pub customer_id: usize,
    pub product_card_id: usize,
}

#[derive(Debug, Serialize)]
pub struct GrainCheck {
    pub rows: usize,
    pub distinct_order_item_ids: usize,
}

impl GrainCheck {
    pub fn holds(&self) -> bool {
        self.rows == self.distinct_order_item_ids
    }
}

#[derive(Debug, Serialize)]
pub struct CommercialChecks {
    pub min_discount_rate: Option<f64>,
    pub max_discount_rate: Option<f64>,
    pub min_net_sales: Option<f64>,
    pub min_gross_sales: Option<f64>,
    pub min_profit: Option<f64>,
    pub ship_before_order_rows: usize,
    pub nonpositive_quantity_rows: usize,
    pub negative_unit_price_rows: usize,
}

#[derive(Debug, Serialize)]
pub struct CorruptionChecks {
    pub bad_order_country_std: usize,
    pub bad_order_city_std: usize,
    pub bad_order_country_clean: usize,
    pub bad_order_city_clean: usize,
    pub bad_customer_country_clean: usize,
    pub bad_customer_city_clean: usize,
}

#[derive(Debug, Serialize)]
pub struct CorrectionMetric {
    pub field: String,
    pub corrected_rows: usize,
}

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub row_counts: RowCounts,
    pub timestamp_nulls: TimestampNulls,
    pub key_nulls: KeyNulls,
    pub grain: GrainCheck,
    pub commercial: CommercialChecks,
    pub corruption: CorruptionChecks,
    pub corrections: Vec<CorrectionMetric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gold: Option<StarReport>,
}

fn count_nulls(table: &Table, column: &str) -> Result<usize> {
    let idx = table.require_column(column)?;
    Ok(table.column_values(idx).filter(|v| v.is_empty()).count())
}

fn count_corrupted(table: &Table, column: &str) -> Result<usize> {
    let idx = table.require_column(column)?;
    Ok(table
        .column_values(idx)
        .filter(|v| v.contains(CORRUPTION_MARKER))
        .count())
}

fn fold_f64(table: &Table, column: &str, pick_max: bool) -> Result<Option<f64>> {
    let idx = table.require_column(column)?;
    Ok(table
        .column_values(idx)
        .filter_map(|v| data::non_empty(v))
        .filter_map(|v| v.parse::<f64>().ok())
        .fold(None, |acc: Option<f64>, v| {
            Some(match acc {
                None => v,
                Some(best) if pick_max => best.max(v),
                Some(best) => best.min(v),
            })
        }))
}

fn count_where(table: &Table, column: &str, pred: impl Fn(&str) -> bool) -> Result<usize> {
    let idx = table.require_column(column)?;
    Ok(table.column_values(idx).filter(|v| pred(v)).count())
}

fn commercial_checks(v1: &Table) -> Result<CommercialChecks> {
    let order_date_idx = v1.require_column("order_date")?;
    let ship_date_idx = v1.require_column("ship_date")?;
    let ship_before_order_rows = v1
        .rows
        .iter()
        .filter(|row| {
            let order = row.get(order_date_idx).and_then(|c| data::parse_warehouse_date(c));
            let ship = row.get(ship_date_idx).and_then(|c| data::parse_warehouse_date(c));
            matches!((order, ship), (Some(order), Some(ship)) if ship < order)
        })
        .count();
    Ok(CommercialChecks {
        min_discount_rate: fold_f64(v1, "discount_rate", false)?,
        max_discount_rate: fold_f64(v1, "discount_rate", true)?,
        min_net_sales: fold_f64(v1, "net_sales", false)?,
        min_gross_sales: fold_f64(v1, "gross_sales", false)?,
        min_profit: fold_f64(v1, "profit", false)?,
        ship_before_order_rows,
        nonpositive_quantity_rows: count_where(v1, "quantity", |v| {
            v.parse::<i64>().is_ok_and(|q| q <= 0)
        })?,
        negative_unit_price_rows: count_where(v1, "unit_price", |v| {
            v.parse::<f64>().is_ok_and(|p| p < 0.0)
        })?,
    })
}

fn correction_metrics(v3: &Table) -> Result<Vec<CorrectionMetric>> {
    let pairs = [
        ("order_country_std", "order_country_clean"),
        ("order_city_std", "order_city_clean"),
        ("customer_country_std", "customer_country_clean"),
        ("customer_city_std", "customer_city_clean"),
    ];
    let mut metrics = Vec::with_capacity(pairs.len());
    for (std_col, clean_col) in pairs {
        let std_idx = v3.require_column(std_col)?;
        let clean_idx = v3.require_column(clean_col)?;
        let corrected_rows = v3
            .rows
            .iter()
            .filter(|row| row.get(std_idx) != row.get(clean_idx))
            .count();
        metrics.push(CorrectionMetric {
            field: clean_col.to_string(),
            corrected_rows,
        });
    }
    Ok(metrics)
}

/// Assembles the full report from already-read tier snapshots.
pub fn build_report(
    bronze_audited: &Table,
    v1: &Table,
    v2: &Table,
    v3: &Table,
    gold: Option<StarReport>,
) -> Result<ValidationReport> {
    Ok(ValidationReport {
        row_counts: RowCounts {
            bronze_audited: bronze_audited.len(),
            silver_v1: v1.len(),
            silver_v2: v2.len(),
            silver_v3: v3.len(),
        },
        timestamp_nulls: TimestampNulls {
            order_ts_nulls: count_nulls(v1, "order_ts")?,
            ship_ts_nulls: count_nulls(v1, "ship_ts")?,
        },
        key_nulls: KeyNulls {
            order_item_id: count_nulls(v1, "order_item_id")?,
            order_id: count_nulls(v1, "order_id")?,
            customer_id: count_nulls(v1, "customer_id")?,
            product_card_id: count_nulls(v1, "product_card_id")?,
        },
        grain: GrainCheck {
            rows: v3.len(),
            distinct_order_item_ids: {
                let idx = v3.require_column("order_item_id")?;
                v3.column_values(idx).collect::<std::collections::HashSet<_>>().len()
            },
        },
        commercial: commercial_checks(v1)?,
        corruption: CorruptionChecks {
            bad_order_country_std: count_corrupted(v2, "order_country_std")?,
            bad_order_city_std: count_corrupted(v2, "order_city_std")?,
            bad_order_country_clean: count_corrupted(v3, "order_country_clean")?,
            bad_order_city_clean: count_corrupted(v3, "order_city_clean")?,
            bad_customer_country_clean: count_corrupted(v3, "customer_country_clean")?,
            bad_customer_city_clean: count_corrupted(v3, "customer_city_clean")?,
        },
        corrections: correction_metrics(v3)?,
        gold,
    })
}

fn metric_rows(report: &ValidationReport) -> Vec<Vec<String>> {
    let mut rows = vec![
        vec!["bronze_audited_rows".into(), report.row_counts.bronze_audited.to_string()],
        vec!["silver_v1_rows".into(), report.row_counts.silver_v1.to_string()],
        vec!["silver_v2_rows".into(), report.row_counts.silver_v2.to_string()],
        vec!["silver_v3_rows".into(), report.row_counts.silver_v3.to_string()],
        vec!["order_ts_nulls".into(), report.timestamp_nulls.order_ts_nulls.to_string()],
        vec!["ship_ts_nulls".into(), report.timestamp_nulls.ship_ts_nulls.to_string()],
        vec!["null_order_item_id".into(), report.key_nulls.order_item_id.to_string()],
        vec!["null_order_id".into(), report.key_nulls.order_id.to_string()],
        vec!["null_customer_id".into(), report.key_nulls.customer_id.to_string()],
        vec!["null_product_card_id".into(), report.key_nulls.product_card_id.to_string()],
        vec!["distinct_order_item_ids".into(), report.grain.distinct_order_item_ids.to_string()],
    ];
    let float = |v: Option<f64>| v.map(|f| f.to_string()).unwrap_or_else(|| "null".into());
    rows.push(vec!["min_discount_rate".into(), float(report.commercial.min_discount_rate)]);
    rows.push(vec!["max_discount_rate".into(), float(report.commercial.max_discount_rate)]);
    rows.push(vec!["min_net_sales".into(), float(report.commercial.min_net_sales)]);
    rows.push(vec!["min_gross_sales".into(), float(report.commercial.min_gross_sales)]);
    rows.push(vec!["min_profit".into(), float(report.commercial.min_profit)]);
    rows.push(vec![
        "ship_before_order_rows".into(),
        report.commercial.ship_before_order_rows.to_string(),
    ]);
    rows.push(vec![
        "nonpositive_quantity_rows".into(),
        report.commercial.nonpositive_quantity_rows.to_string(),
    ]);
    rows.push(vec![
        "negative_unit_price_rows".into(),
        report.commercial.negative_unit_price_rows.to_string(),
    ]);
    rows.push(vec![
        "bad_order_country_std".into(),
        report.corruption.bad_order_country_std.to_string(),
    ]);
    rows.push(vec![
        "bad_order_city_std".into(),
        report.corruption.bad_order_city_std.to_string(),
    ]);
    rows.push(vec![
        "bad_order_country_clean".into(),
        report.corruption.bad_order_country_clean.to_string(),
    ]);
    rows.push(vec![
        "bad_order_city_clean".into(),
        report.corruption.bad_order_city_clean.to_string(),
    ]);
    rows.push(vec![
        "bad_customer_country_clean".into(),
        report.corruption.bad_customer_country_clean.to_string(),
    ]);
    rows.push(vec![
        "bad_customer_city_clean".into(),
        report.corruption.bad_customer_city_clean.to_string(),
    ]);
    for metric in &report.corrections {
        rows.push(vec![
            format!("corrected_{}", metric.field),
            metric.corrected_rows.to_string(),
        ]);
    }
    if let Some(gold) = &report.gold {
        rows.extend(gold.rows());
    }
    rows
}

pub fn execute(args: &ValidateArgs) -> Result<()> {
    let store = Store::open(&args.warehouse)?;
    let bronze_audited = store
        .read(layout::BRONZE_AUDITED)
        .context("Reading the audited bronze tier (run `ingest` and `audit` first)")?;
    let v1 = store
        .read(layout::SILVER_CLEAN_V1)
        .context("Reading silver v1 (run `clean` first)")?;
    let v2 = store
        .read(layout::SILVER_CLEAN_V2)
        .context("Reading silver v2 (run `standardize` first)")?;
    let v3 = store
        .read(layout::SILVER_CLEAN_V3)
        .context("Reading silver v3 (run `apply` first)")?;

    let gold = if store.exists(layout::GOLD_FACT_ORDER_ITEM) {
        let fact = store.read(layout::GOLD_FACT_ORDER_ITEM)?;
        let dim_date = store.read(layout::GOLD_DIM_DATE)?;
        let dim_customer = store.read(layout::GOLD_DIM_CUSTOMER)?;
        let dim_product = store.read(layout::GOLD_DIM_PRODUCT)?;
        Some(star::referential_report(
            &fact,
            &dim_date,
            &dim_customer,
            &dim_product,
            v3.len(),
        )?)
    } else {
        None
    };

    let report = build_report(&bronze_audited, &v1, &v2, &v3, gold)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report::print_table(&["metric", "value"], &metric_rows(&report));
    }

    let mut failures = Vec::new();
    if !report.row_counts.preserved() {
        failures.push("row counts drifted between tiers");
    }
    if !report.grain.holds() {
        failures.push("order_item_id grain violated in silver v3");
    }
    if report.gold.as_ref().is_some_and(|g| !g.is_sound()) {
        failures.push("gold referential validation failed");
    }
    if !failures.is_empty() {
        bail!("structural validation failed: {}", failures.join("; "));
    }
    info!("Validation passed: structural checks clean, metrics above");
    Ok(())
}
