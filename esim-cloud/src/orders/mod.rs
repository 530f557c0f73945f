//! Order orchestrator
//!
//! Owns the order lifecycle:
//!
//! ```text
//! pending ──> paid ──> processing ──> completed
//!    │          │           │
//!    └──────────┴───────────┴──────> failed
//! ```
//!
//! - [`checkout`]: order creation, status query, payment (re)initiation
//! - [`settlement`]: payment events and the provisioning step
//!
//! The `paid -> processing` conditional update is the provisioning claim:
//! only the caller that performs it talks to the partner.

pub mod checkout;
pub mod settlement;

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{Order, OrderStatus, PackagePrice, Product};
use uuid::Uuid;

use crate::pricing::RateResolver;
use crate::qpay::InvoiceGateway;
use crate::roamwifi::{DeliveryNotifier, ProvisioningPartner};
use crate::store::{CatalogStore, OrderStore};

const PAYMENT_METHOD: &str = "qpay";

/// Who is placing or reading an order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<Uuid>,
    pub is_admin: bool,
}

impl Caller {
    pub const fn guest() -> Self {
        Self {
            user_id: None,
            is_admin: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderSettings {
    pub local_currency: String,
    /// Refuse new orders while only the hardcoded fallback rate is known
    pub strict_rate: bool,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            local_currency: "MNT".to_string(),
            strict_rate: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub product_id: Uuid,
    #[serde(default)]
    pub package_price_id: Option<Uuid>,
    #[serde(default)]
    pub provider_price_id: Option<i64>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    /// Admin-only absolute USD price for this order
    #[serde(default)]
    pub custom_price_usd: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub amount: Decimal,
    pub currency: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub product: Product,
    pub package_price: PackagePrice,
    pub invoice_id: String,
    pub payment_url: String,
    pub qr_code: String,
    pub app_url: String,
    pub created_at: i64,
}

/// Persisted order plus the current payment artifacts
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub payment_url: Option<String>,
    pub qr_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PaymentInitiation {
    InvoiceIssued {
        order_number: String,
        invoice_id: String,
        payment_url: String,
        qr_code: String,
        app_url: String,
    },
    /// The existing invoice turned out to be paid
    AlreadyPaid {
        order_number: String,
        order_status: OrderStatus,
    },
}

/// Result of applying one payment notification
#[derive(Debug, Clone, Serialize)]
pub struct WebhookOutcome {
    pub invoice_id: String,
    pub order_number: String,
    pub payment_status: String,
    pub order_status: OrderStatus,
}

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    catalog: Arc<dyn CatalogStore>,
    rates: RateResolver,
    gateway: Arc<dyn InvoiceGateway>,
    partner: Arc<dyn ProvisioningPartner>,
    notifier: Option<Arc<dyn DeliveryNotifier>>,
    settings: OrderSettings,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        catalog: Arc<dyn CatalogStore>,
        rates: RateResolver,
        gateway: Arc<dyn InvoiceGateway>,
        partner: Arc<dyn ProvisioningPartner>,
        settings: OrderSettings,
    ) -> Self {
        Self {
            orders,
            catalog,
            rates,
            gateway,
            partner,
            notifier: None,
            settings,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn DeliveryNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }
}
