//! Gold tier: star-schema construction and referential validation.
//!
//! Dimensions are duplicate-eliminated projections of the silver layer read
//! through the `_current` alias — never a pinned version, never bronze. The
//! geographic attributes take their corrected (`_clean`) or standardized
//! (`_std`) forms so dimension members group on repaired text. `dim_date`
//! spans the full observed date range one calendar day per row, keyed by the
//! same `YYYYMMDD` integer encoding the fact table uses, which is what makes
//! the equality joins land.
//!
//! The post-build referential report is mandatory: the gold write can
//! succeed and still fail sign-off when a fact key has no dimension row.

use std::collections::HashSet;

use anyhow::{Result, bail};
use chrono::{Datelike, NaiveDate};
use itertools::Itertools;
use log::info;
use serde::Serialize;

use crate::{
    cli::StarArgs,
    data,
    layout,
    report,
    store::{Store, Table, WriteMode},
};

const DIM_CUSTOMER_SPEC: &[(&str, &str)] = &[
    ("customer_id", "customer_id"),
    ("customer_segment", "customer_segment"),
    ("customer_country_clean", "customer_country"),
    ("customer_state_std", "customer_state"),
    ("customer_city_clean", "customer_city"),
    ("customer_zipcode_std", "customer_zipcode"),
    ("latitude", "latitude"),
    ("longitude", "longitude"),
];

const DIM_PRODUCT_SPEC: &[(&str, &str)] = &[
    ("product_card_id", "product_card_id"),
    ("product_name", "product_name"),
    ("product_category_id", "product_category_id"),
    ("category_id", "category_id"),
    ("department_id", "department_id"),
    ("catalog_price", "catalog_price"),
    ("product_description", "product_description"),
    ("product_status", "product_status"),
];

const DIM_CATEGORY_SPEC: &[(&str, &str)] = &[
    ("category_id", "category_id"),
    ("category_name", "category_name"),
];

const DIM_DEPARTMENT_SPEC: &[(&str, &str)] = &[
    ("department_id", "department_id"),
    ("department_name", "department_name"),
];

const FACT_ID_SPEC: &[(&str, &str)] = &[
    ("order_item_id", "order_item_id"),
    ("order_id", "order_id"),
    ("customer_id", "customer_id"),
    ("product_card_id", "product_card_id"),
    ("category_id", "category_id"),
    ("department_id", "department_id"),
];

const FACT_TAIL_SPEC: &[(&str, &str)] = &[
    ("gross_sales", "gross_sales"),
    ("net_sales", "net_sales"),
    ("discount_amount", "discount_amount"),
    ("discount_rate", "discount_rate"),
    ("profit", "profit"),
    ("quantity", "quantity"),
    ("unit_price", "unit_price"),
    ("days_for_shipping_real", "days_for_shipping_real"),
    ("days_for_shipment_scheduled", "days_for_shipment_scheduled"),
    ("late_delivery_risk", "late_delivery_risk"),
    ("is_late_by_days", "is_late_by_days"),
    ("delivery_status", "delivery_status"),
    ("shipping_mode_std", "shipping_mode"),
    ("order_status", "order_status"),
    ("market_std", "market"),
    ("order_region_std", "order_region"),
    ("order_country_clean", "order_country"),
    ("order_state_std", "order_state"),
    ("order_city_clean", "order_city"),
    ("order_zipcode_std", "order_zipcode"),
    ("_ingest_ts", "_ingest_ts"),
    ("_batch_id", "_batch_id"),
];

pub struct StarBuild {
    pub dim_date: Table,
    pub dim_customer: Table,
    pub dim_product: Table,
    pub dim_category: Table,
    pub dim_department: Table,
    pub fact: Table,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StarReport {
    pub silver_rows: usize,
    pub fact_rows: usize,
    pub distinct_order_item_ids: usize,
    pub missing_customer_dim: usize,
    pub missing_product_dim: usize,
    pub missing_order_date_key: usize,
    pub missing_ship_date_key: usize,
}

impl StarReport {
    /// Sign-off condition: grain intact, every foreign key resolvable.
    pub fn is_sound(&self) -> bool {
        self.fact_rows == self.silver_rows
            && self.distinct_order_item_ids == self.fact_rows
            && self.missing_customer_dim == 0
            && self.missing_product_dim == 0
            && self.missing_order_date_key == 0
            && self.missing_ship_date_key == 0
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        vec![
            vec!["silver_rows".to_string(), self.silver_rows.to_string()],
            vec!["fact_rows".to_string(), self.fact_rows.to_string()],
            vec![
                "distinct_order_item_ids".to_string(),
                self.distinct_order_item_ids.to_string(),
            ],
            vec![
                "missing_customer_dim".to_string(),
                self.missing_customer_dim.to_string(),
            ],
            vec![
                "missing_product_dim".to_string(),
                self.missing_product_dim.to_string(),
            ],
            vec![
                "missing_order_date_key".to_string(),
                self.missing_order_date_key.to_string(),
            ],
            vec![
                "missing_ship_date_key".to_string(),
                self.missing_ship_date_key.to_string(),
            ],
        ]
    }
}

/// `YYYYMMDD` integer encoding shared by `dim_date` and the fact table.
pub fn date_key(date: NaiveDate) -> i32 {
    date.year() * 10_000 + date.month() as i32 * 100 + date.day() as i32
}

/// Deduplicated projection of `spec` columns, first-seen order.
fn project_distinct(silver: &Table, spec: &[(&str, &str)]) -> Result<Table> {
    let indices = spec
        .iter()
        .map(|(source, _)| silver.require_column(source))
        .collect::<Result<Vec<_>>>()?;
    let rows = silver
        .rows
        .iter()
        .map(|row| {
            indices
                .iter()
                .map(|&idx| row.get(idx).cloned().unwrap_or_default())
                .collect::<Vec<_>>()
        })
        .unique()
        .collect::<Vec<_>>();
    Ok(Table {
        columns: spec.iter().map(|(_, target)| target.to_string()).collect(),
        rows,
    })
}

fn build_dim_date(silver: &Table) -> Result<Table> {
    let order_idx = silver.require_column("order_date")?;
    let ship_idx = silver.require_column("ship_date")?;
    let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
    for row in &silver.rows {
        for idx in [order_idx, ship_idx] {
            let Some(date) = row.get(idx).and_then(|c| data::parse_warehouse_date(c)) else {
                continue;
            };
            bounds = Some(match bounds {
                None => (date, date),
                Some((min, max)) => (min.min(date), max.max(date)),
            });
        }
    }

    let mut table = Table::new(
        [
            "date_key",
            "date",
            "year",
            "quarter",
            "month",
            "year_month",
            "week_of_year",
            "day_name",
            "day_of_week",
        ]
        .map(String::from)
        .to_vec(),
    );
    let Some((min, max)) = bounds else {
        return Ok(table);
    };
    for day in min.iter_days() {
        if day > max {
            break;
        }
        table.rows.push(vec![
            date_key(day).to_string(),
            day.format(data::DATE_FORMAT).to_string(),
            day.year().to_string(),
            ((day.month() - 1) / 3 + 1).to_string(),
            day.month().to_string(),
            day.format("%Y-%m").to_string(),
            day.iso_week().week().to_string(),
            day.format("%A").to_string(),
            day.weekday().number_from_sunday().to_string(),
        ]);
    }
    Ok(table)
}

fn build_fact(silver: &Table) -> Result<Table> {
    let id_indices = FACT_ID_SPEC
        .iter()
        .map(|(source, _)| silver.require_column(source))
        .collect::<Result<Vec<_>>>()?;
    let tail_indices = FACT_TAIL_SPEC
        .iter()
        .map(|(source, _)| silver.require_column(source))
        .collect::<Result<Vec<_>>>()?;
    let order_date_idx = silver.require_column("order_date")?;
    let ship_date_idx = silver.require_column("ship_date")?;

    let mut columns = FACT_ID_SPEC
        .iter()
        .map(|(_, target)| target.to_string())
        .collect::<Vec<_>>();
    columns.extend(["order_date_key", "ship_date_key"].map(String::from));
    columns.extend(FACT_TAIL_SPEC.iter().map(|(_, target)| target.to_string()));

    let encode = |row: &Vec<String>, idx: usize| {
        row.get(idx)
            .and_then(|c| data::parse_warehouse_date(c))
            .map(|d| date_key(d).to_string())
            .unwrap_or_default()
    };
    let rows = silver
        .rows
        .iter()
        .map(|row| {
            let mut out = Vec::with_capacity(columns.len());
            for &idx in &id_indices {
                out.push(row.get(idx).cloned().unwrap_or_default());
            }
            out.push(encode(row, order_date_idx));
            out.push(encode(row, ship_date_idx));
            for &idx in &tail_indices {
                out.push(row.get(idx).cloned().unwrap_or_default());
            }
            out
        })
        .collect();

    Ok(Table { columns, rows })
}

/// Builds every gold table from the current silver snapshot.
pub fn build_star(silver: &Table) -> Result<StarBuild> {
    Ok(StarBuild {
        dim_date: build_dim_date(silver)?,
        dim_customer: project_distinct(silver, DIM_CUSTOMER_SPEC)?,
        dim_product: project_distinct(silver, DIM_PRODUCT_SPEC)?,
        dim_category: project_distinct(silver, DIM_CATEGORY_SPEC)?,
        dim_department: project_distinct(silver, DIM_DEPARTMENT_SPEC)?,
        fact: build_fact(silver)?,
    })
}

fn key_set(table: &Table, column: &str) -> Result<HashSet<String>> {
    let idx = table.require_column(column)?;
    Ok(table
        .column_values(idx)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .collect())
}

/// Counts fact keys that fail to resolve in their dimension. A NULL foreign
/// key counts as a miss — it can never join.
pub fn referential_report(
    fact: &Table,
    dim_date: &Table,
    dim_customer: &Table,
    dim_product: &Table,
    silver_rows: usize,
) -> Result<StarReport> {
    let date_keys = key_set(dim_date, "date_key")?;
    let customer_ids = key_set(dim_customer, "customer_id")?;
    let product_ids = key_set(dim_product, "product_card_id")?;

    let grain_idx = fact.require_column("order_item_id")?;
    let customer_idx = fact.require_column("customer_id")?;
    let product_idx = fact.require_column("product_card_id")?;
    let order_key_idx = fact.require_column("order_date_key")?;
    let ship_key_idx = fact.require_column("ship_date_key")?;

    let mut report = StarReport {
        silver_rows,
        fact_rows: fact.len(),
        distinct_order_item_ids: fact
            .column_values(grain_idx)
            .collect::<HashSet<_>>()
            .len(),
        missing_customer_dim: 0,
        missing_product_dim: 0,
        missing_order_date_key: 0,
        missing_ship_date_key: 0,
    };
    for row in &fact.rows {
        let miss = |set: &HashSet<String>, idx: usize| {
            row.get(idx)
                .filter(|v| !v.is_empty())
                .is_none_or(|v| !set.contains(v))
        };
        if miss(&customer_ids, customer_idx) {
            report.missing_customer_dim += 1;
        }
        if miss(&product_ids, product_idx) {
            report.missing_product_dim += 1;
        }
        if miss(&date_keys, order_key_idx) {
            report.missing_order_date_key += 1;
        }
        if miss(&date_keys, ship_key_idx) {
            report.missing_ship_date_key += 1;
        }
    }
    Ok(report)
}

pub fn execute(args: &StarArgs) -> Result<()> {
    let store = Store::open(&args.warehouse)?;
    let silver = store.read(layout::SILVER_CLEAN_CURRENT)?;
    let build = build_star(&silver)?;

    store.write(layout::GOLD_DIM_DATE, &build.dim_date, WriteMode::CreateOrReplace)?;
    store.write(layout::GOLD_DIM_CUSTOMER, &build.dim_customer, WriteMode::CreateOrReplace)?;
    store.write(layout::GOLD_DIM_PRODUCT, &build.dim_product, WriteMode::CreateOrReplace)?;
    store.write(layout::GOLD_DIM_CATEGORY, &build.dim_category, WriteMode::CreateOrReplace)?;
    store.write(
        layout::GOLD_DIM_DEPARTMENT,
        &build.dim_department,
        WriteMode::CreateOrReplace,
    )?;
    store.write(layout::GOLD_FACT_ORDER_ITEM, &build.fact, WriteMode::CreateOrReplace)?;
    info!(
        "Gold build complete: {} date(s), {} customer(s), {} product(s), {} fact row(s)",
        build.dim_date.len(),
        build.dim_customer.len(),
        build.dim_product.len(),
        build.fact.len()
    );

    let report = referential_report(
        &build.fact,
        &build.dim_date,
        &build.dim_customer,
        &build.dim_product,
        silver.len(),
    )?;
    report::print_table(&["check", "value"], &report.rows());
    if !report.is_sound() {
        bail!("gold build failed referential validation; see the check counts above");
    }
    info!("Referential validation passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silver_row(
        order_item_id: &str,
        customer_id: &str,
        product_id: &str,
        order_date: &str,
        ship_date: &str,
    ) -> Vec<String> {
        let mut row = std::collections::HashMap::new();
        row.insert("order_item_id", order_item_id);
        row.insert("order_id", "10");
        row.insert("customer_id", customer_id);
        row.insert("product_card_id", product_id);
        row.insert("category_id", "7");
        row.insert("department_id", "3");
        row.insert("order_date", order_date);
        row.insert("ship_date", ship_date);
        silver_columns()
            .iter()
            .map(|c| row.get(c.as_str()).copied().unwrap_or("x").to_string())
            .collect()
    }

    fn silver_columns() -> Vec<String> {
        let mut columns = FACT_ID_SPEC
            .iter()
            .chain(FACT_TAIL_SPEC)
            .map(|(source, _)| source.to_string())
            .collect::<Vec<_>>();
        columns.extend(["order_date", "ship_date"].map(String::from));
        columns.extend(
            DIM_CUSTOMER_SPEC
                .iter()
                .chain(DIM_PRODUCT_SPEC)
                .chain(DIM_CATEGORY_SPEC)
                .chain(DIM_DEPARTMENT_SPEC)
                .map(|(source, _)| source.to_string()),
        );
        let mut seen = std::collections::HashSet::new();
        columns.retain(|c| seen.insert(c.clone()));
        columns
    }

    fn silver_fixture(rows: Vec<Vec<String>>) -> Table {
        Table {
            columns: silver_columns(),
            rows,
        }
    }

    #[test]
    fn date_key_encodes_yyyymmdd() {
        let date = NaiveDate::from_ymd_opt(2016, 1, 9).unwrap();
        assert_eq!(date_key(date), 20160109);
    }

    #[test]
    fn dim_date_spans_the_observed_range_inclusive() {
        let silver = silver_fixture(vec![
            silver_row("1", "100", "200", "2016-01-01", "2016-01-04"),
            silver_row("2", "100", "200", "2016-01-03", "2016-01-10"),
        ]);
        let dim = build_dim_date(&silver).expect("dim_date");
        assert_eq!(dim.len(), 10);
        let key_idx = dim.require_column("date_key").unwrap();
        assert_eq!(dim.rows[0][key_idx], "20160101");
        assert_eq!(dim.rows[9][key_idx], "20160110");
        let name_idx = dim.require_column("day_name").unwrap();
        assert_eq!(dim.rows[0][name_idx], "Friday");
        let dow_idx = dim.require_column("day_of_week").unwrap();
        assert_eq!(dim.rows[0][dow_idx], "6");
        let week_idx = dim.require_column("week_of_year").unwrap();
        assert_eq!(dim.rows[0][week_idx], "53");
    }

    #[test]
    fn dimensions_deduplicate_their_projection() {
        let silver = silver_fixture(vec![
            silver_row("1", "100", "200", "2016-01-01", "2016-01-02"),
            silver_row("2", "100", "200", "2016-01-01", "2016-01-02"),
            silver_row("3", "101", "200", "2016-01-01", "2016-01-02"),
        ]);
        let customers = project_distinct(&silver, DIM_CUSTOMER_SPEC).expect("dim");
        assert_eq!(customers.len(), 2);
        let products = project_distinct(&silver, DIM_PRODUCT_SPEC).expect("dim");
        assert_eq!(products.len(), 1);
    }

    #[test]
    fn referential_report_is_sound_for_a_complete_build() {
        let silver = silver_fixture(vec![
            silver_row("1", "100", "200", "2016-01-01", "2016-01-03"),
            silver_row("2", "101", "200", "2016-01-02", "2016-01-05"),
        ]);
        let build = build_star(&silver).expect("build");
        let report = referential_report(
            &build.fact,
            &build.dim_date,
            &build.dim_customer,
            &build.dim_product,
            silver.len(),
        )
        .expect("report");
        assert!(report.is_sound(), "unexpected report: {report:?}");
    }

    #[test]
    fn null_dates_surface_as_missing_date_keys() {
        let silver = silver_fixture(vec![
            silver_row("1", "100", "200", "2016-01-01", "2016-01-03"),
            silver_row("2", "101", "200", "", "2016-01-02"),
        ]);
        let build = build_star(&silver).expect("build");
        let report = referential_report(
            &build.fact,
            &build.dim_date,
            &build.dim_customer,
            &build.dim_product,
            silver.len(),
        )
        .expect("report");
        assert_eq!(report.missing_order_date_key, 1);
        assert!(!report.is_sound());
    }
}
