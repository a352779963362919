//! Typed values and cast primitives for the silver tier.
//!
//! The warehouse medium is stringly typed (CSV cells, empty string = NULL);
//! this module owns the conversions in and out. Cast failures surface as
//! `None`, never as errors: the pipeline's contract is to complete the batch
//! and push data-quality issues into the validation metrics.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Candidate patterns for the source system's ambiguous event timestamps,
/// tried in declaration order; the first full-input match wins.
///
/// The source emits Spark-style `M/d/yyyy H:mm`, `MM/dd/yyyy HH:mm`,
/// `M/d/yyyy H:mm:ss`, and `MM/dd/yyyy HH:mm:ss`. chrono's numeric fields
/// accept both padded and bare digits, so each padded/bare pair collapses
/// into one pattern here; minute precision stays ahead of second precision.
pub const EVENT_TS_FORMATS: &[&str] = &["%m/%d/%Y %H:%M", "%m/%d/%Y %H:%M:%S"];

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Double(f64),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Deterministic cell rendition; `render` and the cast functions agree,
    /// so re-reading a written table round-trips.
    pub fn render(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Double(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
            Value::Timestamp(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Integer,
    Double,
    Text,
}

/// Casts a raw cell to the requested type. Empty input and uncastable input
/// both produce `None`; the distinction is not preserved (both are NULL in
/// the warehouse).
pub fn cast_value(raw: &str, kind: CastKind) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match kind {
        CastKind::Text => Some(Value::Text(raw.to_string())),
        CastKind::Integer => cast_integer(trimmed).map(Value::Integer),
        CastKind::Double => trimmed.parse::<f64>().ok().map(Value::Double),
    }
}

/// Integer cast with the source store's leniency: decimal strings truncate
/// toward zero (`"91.25"` casts to `91`), anything else is NULL.
pub fn cast_integer(trimmed: &str) -> Option<i64> {
    if let Ok(parsed) = trimmed.parse::<i64>() {
        return Some(parsed);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| f.trunc() as i64)
}

/// Resolves an ambiguous event-timestamp string through the prioritized
/// [`EVENT_TS_FORMATS`] chain. `None` means no pattern matched, which the
/// clean stage records as a parse-null metric.
pub fn parse_event_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    EVENT_TS_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
}

/// Parses a date cell previously written by this pipeline (`%Y-%m-%d`).
pub fn parse_warehouse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// Late-delivery flag: `1` iff both operands are present and the realized
/// shipping days exceed the scheduled days. A NULL operand compares as
/// not-late, preserving the three-valued-logic behavior of the source
/// queries.
pub fn late_by_days(real: Option<i64>, scheduled: Option<i64>) -> i64 {
    match (real, scheduled) {
        (Some(real), Some(scheduled)) if real > scheduled => 1,
        _ => 0,
    }
}

/// Empty-cell-as-NULL accessor used by every stage.
pub fn non_empty(cell: &str) -> Option<&str> {
    if cell.is_empty() { None } else { Some(cell) }
}
