//! Silver v1: typed casts and temporal resolution over the audited bronze.
//!
//! One declarative cast table drives the stage, mirroring the SELECT that
//! defined the original silver layer: identifier columns become integers,
//! monetary and coordinate columns become doubles, categoricals stay text,
//! and the two ambiguous event-timestamp strings resolve through the
//! prioritized format chain. A value that cannot be cast becomes NULL for
//! that row; the batch always completes and the damage shows up in the
//! validation metrics instead.

use anyhow::{Result, bail};
use itertools::Itertools;
use log::info;

use crate::{
    audit::{BATCH_ID_COLUMN, INGEST_TS_COLUMN},
    cli::CleanArgs,
    data::{self, CastKind, Value},
    layout,
    store::{Store, Table, WriteMode},
};

const ORDER_TS_SOURCE: &str = "order_date_dateorders";
const SHIP_TS_SOURCE: &str = "shipping_date_dateorders";

/// Identifier casts emitted ahead of the temporal block.
const ID_CASTS: &[(&str, &str)] = &[
    ("order_item_id", "order_item_id"),
    ("order_id", "order_id"),
    ("customer_id", "customer_id"),
    ("product_card_id", "product_card_id"),
    ("category_id", "category_id"),
    ("department_id", "department_id"),
];

/// `(source, target, kind)` casts emitted after the temporal block, in
/// output order.
const MEASURE_CASTS: &[(&str, &str, CastKind)] = &[
    ("sales", "gross_sales", CastKind::Double),
    ("order_item_total", "net_sales", CastKind::Double),
    ("order_item_discount", "discount_amount", CastKind::Double),
    ("order_item_discount_rate", "discount_rate", CastKind::Double),
    ("order_profit_per_order", "profit", CastKind::Double),
    ("order_item_quantity", "quantity", CastKind::Integer),
    ("order_item_product_price", "unit_price", CastKind::Double),
    ("product_price", "catalog_price", CastKind::Double),
    ("days_for_shipping_real", "days_for_shipping_real", CastKind::Integer),
    ("days_for_shipment_scheduled", "days_for_shipment_scheduled", CastKind::Integer),
    ("late_delivery_risk", "late_delivery_risk", CastKind::Integer),
    ("delivery_status", "delivery_status", CastKind::Text),
    ("shipping_mode", "shipping_mode", CastKind::Text),
    ("order_status", "order_status", CastKind::Text),
    ("market", "market", CastKind::Text),
    ("order_region", "order_region", CastKind::Text),
    ("order_country", "order_country", CastKind::Text),
    ("order_state", "order_state", CastKind::Text),
    ("order_city", "order_city", CastKind::Text),
    ("order_zipcode", "order_zipcode", CastKind::Text),
    ("customer_segment", "customer_segment", CastKind::Text),
    ("customer_country", "customer_country", CastKind::Text),
    ("customer_state", "customer_state", CastKind::Text),
    ("customer_city", "customer_city", CastKind::Text),
    ("customer_zipcode", "customer_zipcode", CastKind::Text),
    ("latitude", "latitude", CastKind::Double),
    ("longitude", "longitude", CastKind::Double),
    ("product_name", "product_name", CastKind::Text),
    ("product_category_id", "product_category_id", CastKind::Integer),
    ("product_description", "product_description", CastKind::Text),
    ("product_status", "product_status", CastKind::Text),
    ("category_name", "category_name", CastKind::Text),
    ("department_name", "department_name", CastKind::Text),
];

#[derive(Debug)]
pub struct CleanOutcome {
    pub table: Table,
    pub order_ts_nulls: usize,
    pub ship_ts_nulls: usize,
}

fn cast_cell(row: &[String], index: usize, kind: CastKind) -> String {
    row.get(index)
        .and_then(|cell| data::cast_value(cell, kind))
        .map(|value| value.render())
        .unwrap_or_default()
}

/// Builds the silver v1 table from the audited bronze snapshot.
pub fn build_clean(audited: &Table) -> Result<CleanOutcome> {
    let required = ID_CASTS
        .iter()
        .map(|(source, _)| *source)
        .chain([ORDER_TS_SOURCE, SHIP_TS_SOURCE])
        .chain(MEASURE_CASTS.iter().map(|(source, _, _)| *source))
        .chain([INGEST_TS_COLUMN, BATCH_ID_COLUMN])
        .collect::<Vec<_>>();
    let missing = required
        .iter()
        .filter(|name| audited.column_index(name).is_none())
        .join(", ");
    if !missing.is_empty() {
        bail!("audited bronze table is missing column(s): {missing}");
    }

    let index_of = |name: &str| audited.column_index(name).expect("column checked above");
    let id_indices = ID_CASTS
        .iter()
        .map(|(source, _)| index_of(source))
        .collect::<Vec<_>>();
    let measure_indices = MEASURE_CASTS
        .iter()
        .map(|(source, _, kind)| (index_of(source), *kind))
        .collect::<Vec<_>>();
    let order_ts_idx = index_of(ORDER_TS_SOURCE);
    let ship_ts_idx = index_of(SHIP_TS_SOURCE);
    let real_days_idx = index_of("days_for_shipping_real");
    let scheduled_days_idx = index_of("days_for_shipment_scheduled");
    let ingest_ts_idx = index_of(INGEST_TS_COLUMN);
    let batch_id_idx = index_of(BATCH_ID_COLUMN);

    let mut columns = Vec::new();
    columns.extend(ID_CASTS.iter().map(|(_, target)| target.to_string()));
    columns.extend(
        ["order_ts_raw", "ship_ts_raw", "order_ts", "ship_ts", "order_date", "ship_date"]
            .map(String::from),
    );
    columns.extend(MEASURE_CASTS.iter().map(|(_, target, _)| target.to_string()));
    columns.extend(["is_late_by_days", INGEST_TS_COLUMN, BATCH_ID_COLUMN].map(String::from));

    let mut rows = Vec::with_capacity(audited.len());
    let mut order_ts_nulls = 0usize;
    let mut ship_ts_nulls = 0usize;
    for row in &audited.rows {
        let mut out = Vec::with_capacity(columns.len());
        for &index in &id_indices {
            out.push(cast_cell(row, index, CastKind::Integer));
        }

        let order_ts_raw = row.get(order_ts_idx).cloned().unwrap_or_default();
        let ship_ts_raw = row.get(ship_ts_idx).cloned().unwrap_or_default();
        let order_ts = data::parse_event_timestamp(&order_ts_raw);
        let ship_ts = data::parse_event_timestamp(&ship_ts_raw);
        if order_ts.is_none() {
            order_ts_nulls += 1;
        }
        if ship_ts.is_none() {
            ship_ts_nulls += 1;
        }
        out.push(order_ts_raw);
        out.push(ship_ts_raw);
        out.push(render_opt(order_ts.map(Value::Timestamp)));
        out.push(render_opt(ship_ts.map(Value::Timestamp)));
        out.push(render_opt(order_ts.map(|ts| Value::Date(ts.date()))));
        out.push(render_opt(ship_ts.map(|ts| Value::Date(ts.date()))));

        for &(index, kind) in &measure_indices {
            out.push(cast_cell(row, index, kind));
        }

        let real_days = row.get(real_days_idx).and_then(|c| data::cast_integer(c.trim()));
        let scheduled_days = row
            .get(scheduled_days_idx)
            .and_then(|c| data::cast_integer(c.trim()));
        out.push(data::late_by_days(real_days, scheduled_days).to_string());

        out.push(row.get(ingest_ts_idx).cloned().unwrap_or_default());
        out.push(row.get(batch_id_idx).cloned().unwrap_or_default());
        rows.push(out);
    }

    Ok(CleanOutcome {
        table: Table { columns, rows },
        order_ts_nulls,
        ship_ts_nulls,
    })
}

fn render_opt(value: Option<Value>) -> String {
    value.map(|v| v.render()).unwrap_or_default()
}

pub fn execute(args: &CleanArgs) -> Result<()> {
    let store = Store::open(&args.warehouse)?;
    let audited = store.read(layout::BRONZE_AUDITED)?;
    let outcome = build_clean(&audited)?;
    store.write(layout::SILVER_CLEAN_V1, &outcome.table, WriteMode::CreateOrReplace)?;
    info!(
        "Cleaned {} row(s) -> '{}' (timestamp parse nulls: order={}, ship={})",
        outcome.table.len(),
        layout::SILVER_CLEAN_V1,
        outcome.order_ts_nulls,
        outcome.ship_ts_nulls
    );
    Ok(())
}
