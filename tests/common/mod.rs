#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory the warehouse tables live in for this test.
    pub fn warehouse(&self) -> PathBuf {
        self.temp_dir.path().join("warehouse")
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }
}

/// One row of the synthetic source extract. Only the fields the tests vary
/// are parameters; everything else takes a plausible constant.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub order_item_id: i64,
    pub order_id: i64,
    pub customer_id: i64,
    pub product_card_id: i64,
    pub order_ts: String,
    pub ship_ts: String,
    pub order_country: String,
    pub order_city: String,
    pub customer_country: String,
    pub customer_city: String,
    pub days_real: i64,
    pub days_scheduled: i64,
}

impl RawRow {
    pub fn new(order_item_id: i64) -> Self {
        RawRow {
            order_item_id,
            order_id: 9000 + order_item_id,
            customer_id: 100,
            product_card_id: 200,
            order_ts: "1/2/2016 10:30".to_string(),
            ship_ts: "1/4/2016 8:15".to_string(),
            order_country: "Puerto Rico".to_string(),
            order_city: "San Juan".to_string(),
            customer_country: "Estados Unidos".to_string(),
            customer_city: "Caguas".to_string(),
            days_real: 3,
            days_scheduled: 4,
        }
    }
}

/// Display-style headers as the source system emits them; the ingest stage
/// is what reduces these to snake_case.
pub const EXTRACT_HEADERS: &[&str] = &[
    "Order Item Id",
    "Order Id",
    "Customer Id",
    "Product Card Id",
    "Category Id",
    "Department Id",
    "order date (DateOrders)",
    "shipping date (DateOrders)",
    "Sales",
    "Order Item Total",
    "Order Item Discount",
    "Order Item Discount Rate",
    "Order Profit Per Order",
    "Order Item Quantity",
    "Order Item Product Price",
    "Product Price",
    "Days for shipping (real)",
    "Days for shipment (scheduled)",
    "Late_delivery_risk",
    "Delivery Status",
    "Shipping Mode",
    "Order Status",
    "Market",
    "Order Region",
    "Order Country",
    "Order State",
    "Order City",
    "Order Zipcode",
    "Customer Segment",
    "Customer Country",
    "Customer State",
    "Customer City",
    "Customer Zipcode",
    "Latitude",
    "Longitude",
    "Product Name",
    "Product Category Id",
    "Product Description",
    "Product Status",
    "Category Name",
    "Department Name",
];

/// Renders the extract as CSV text. Values are kept comma- and quote-free
/// by construction, so plain joins are safe here.
pub fn extract_csv(rows: &[RawRow]) -> String {
    let mut out = EXTRACT_HEADERS.join(",");
    out.push('\n');
    for row in rows {
        let late = i64::from(row.days_real > row.days_scheduled);
        let cells: Vec<String> = vec![
            row.order_item_id.to_string(),
            row.order_id.to_string(),
            row.customer_id.to_string(),
            row.product_card_id.to_string(),
            "7".to_string(),
            "3".to_string(),
            row.order_ts.clone(),
            row.ship_ts.clone(),
            "100.0".to_string(),
            "90.0".to_string(),
            "10.0".to_string(),
            "0.1".to_string(),
            "20.5".to_string(),
            "2".to_string(),
            "50.0".to_string(),
            "50.0".to_string(),
            row.days_real.to_string(),
            row.days_scheduled.to_string(),
            late.to_string(),
            "Advance shipping".to_string(),
            "Standard Class".to_string(),
            "COMPLETE".to_string(),
            "LATAM".to_string(),
            "Central America".to_string(),
            row.order_country.clone(),
            "PR".to_string(),
            row.order_city.clone(),
            "725".to_string(),
            "Consumer".to_string(),
            row.customer_country.clone(),
            "PR".to_string(),
            row.customer_city.clone(),
            "725".to_string(),
            "18.2".to_string(),
            "-66.3".to_string(),
            "Smart Watch".to_string(),
            "73".to_string(),
            "".to_string(),
            "0".to_string(),
            "Sporting Goods".to_string(),
            "Fan Shop".to_string(),
        ];
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}
