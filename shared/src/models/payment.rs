//! Payment transaction model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Payment status as reported by the gateway, normalized
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Cancelled,
    Unknown,
}

impl PaymentStatus {
    /// Map the gateway's status string, ignoring case and surrounding space
    pub fn from_provider(status: &str) -> Self {
        match status.trim().to_ascii_uppercase().as_str() {
            "PAID" => Self::Paid,
            "PENDING" => Self::Pending,
            "FAILED" => Self::Failed,
            "CANCELLED" => Self::Cancelled,
            _ => Self::Unknown,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }

    /// Parse the stored lowercase form; unrecognized values read as `Unknown`
    pub fn from_db(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "paid" => Self::Paid,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The current payment attempt of an order
///
/// One row per order; re-issuing an invoice or receiving a webhook updates it
/// in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: Uuid,
    pub order_id: Uuid,
    /// Gateway invoice id, later the gateway transaction id
    pub provider_transaction_id: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub payment_method: String,
    /// Gateway payload kept for audit (QR, URLs, webhook fields)
    pub transaction_data: serde_json::Value,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PaymentTransaction {
    pub fn qr_code(&self) -> Option<&str> {
        self.transaction_data.get("qr_code").and_then(|v| v.as_str())
    }

    pub fn web_url(&self) -> Option<&str> {
        self.transaction_data.get("web_url").and_then(|v| v.as_str())
    }
}
