//! Currency rate history

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a rate row came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    #[default]
    Api,
    Manual,
}

impl RateSource {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Manual => "manual",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "manual" => Self::Manual,
            _ => Self::Api,
        }
    }
}

/// Point-in-time exchange rate (append-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyRate {
    pub id: Uuid,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
    pub source: RateSource,
    pub created_at: i64,
}
