//! Logical table names for the three warehouse tiers.
//!
//! Downstream consumers read the silver layer through
//! [`SILVER_CLEAN_CURRENT`]; the versioned `_v2`/`_v3` names record the
//! evolution history of the cleaning logic and are repointed, never edited.

pub const BRONZE_RAW: &str = "bronze.dataco_supplychain_raw";
pub const BRONZE_AUDITED: &str = "bronze.dataco_supplychain_raw_audited";

pub const SILVER_CLEAN_V1: &str = "silver.dataco_supplychain_clean";
pub const SILVER_CLEAN_V2: &str = "silver.dataco_supplychain_clean_v2";
pub const SILVER_CLEAN_V3: &str = "silver.dataco_supplychain_clean_v3";
pub const SILVER_CLEAN_CURRENT: &str = "silver.dataco_supplychain_clean_current";
pub const SILVER_REF_TEXT_FIXES: &str = "silver.ref_text_fixes";

pub const GOLD_DIM_DATE: &str = "gold.dim_date";
pub const GOLD_DIM_CUSTOMER: &str = "gold.dim_customer";
pub const GOLD_DIM_PRODUCT: &str = "gold.dim_product";
pub const GOLD_DIM_CATEGORY: &str = "gold.dim_category";
pub const GOLD_DIM_DEPARTMENT: &str = "gold.dim_department";
pub const GOLD_FACT_ORDER_ITEM: &str = "gold.fact_order_item";
