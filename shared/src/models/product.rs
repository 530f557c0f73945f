//! Catalog product (one provider SKU as sold in the storefront)

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: Uuid,
    /// Provider SKU this product sells
    pub sku_id: String,
    pub name: String,
    pub description: String,
    /// Display text such as "10GB"
    pub data_limit: String,
    pub validity_days: i32,
    pub countries: Vec<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}
