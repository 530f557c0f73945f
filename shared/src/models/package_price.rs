//! Package price model
//!
//! A provider package variant (data volume x validity) within a SKU,
//! plus the admin pricing overlay. `effective_*` fields are derived from
//! `raw_price_usd`, `markup_percent` and `override_price_usd` and are
//! rewritten whenever one of those changes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Which rule produced the effective price
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    #[default]
    Base,
    Markup,
    Override,
}

impl PriceSource {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Markup => "markup",
            Self::Override => "override",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "markup" => Self::Markup,
            "override" => Self::Override,
            _ => Self::Base,
        }
    }
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagePrice {
    pub id: Uuid,
    pub sku_id: String,
    /// Provider price id, unique within the provider namespace
    pub provider_price_id: i64,
    pub api_code: String,
    pub show_name: String,
    /// Data volume, in `unit`
    pub flows: Decimal,
    pub unit: String,
    pub days: i32,
    pub raw_price_usd: Decimal,
    pub markup_percent: Option<Decimal>,
    pub override_price_usd: Option<Decimal>,
    pub effective_price_usd: Decimal,
    /// None when no exchange rate was available at recompute time
    pub effective_price_local: Option<Decimal>,
    pub exchange_rate: Option<Decimal>,
    pub price_source: PriceSource,
    pub active: bool,
    pub last_synced_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}
