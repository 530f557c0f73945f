//! QPay invoice gateway
//!
//! - [`client`]: outbound invoice creation and payment checks
//! - [`webhook`]: inbound payment notification parsing and signature check

pub mod client;
pub mod webhook;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::PaymentStatus;

pub use client::QPayClient;
pub use webhook::{PaymentEvent, WebhookError, verify_signature};

#[derive(Debug, thiserror::Error)]
pub enum QPayError {
    #[error("QPay request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Non-zero response code; `message` is the gateway's text, verbatim
    #[error("{message}")]
    Rejected { code: String, message: String },
    #[error("unexpected QPay response: {0}")]
    Decode(String),
}

impl QPayError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, QPayError::Transport(e) if e.is_timeout())
    }
}

#[derive(Debug, Clone)]
pub struct InvoiceRequest {
    /// Sender reference echoed back in the webhook
    pub order_number: String,
    pub description: String,
    pub receiver: String,
    /// Whole local-currency units
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invoice {
    pub invoice_id: String,
    pub qr_code: String,
    pub web_url: String,
    pub app_url: String,
}

#[derive(Debug, Clone)]
pub struct PaymentCheck {
    pub invoice_id: String,
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    /// Status string as the gateway sent it
    pub provider_status: String,
    pub paid_amount: Option<Decimal>,
    pub payment_date: Option<String>,
}

/// Invoice side of the payment provider
#[async_trait]
pub trait InvoiceGateway: Send + Sync {
    async fn create_invoice(&self, req: &InvoiceRequest) -> Result<Invoice, QPayError>;

    async fn check_payment(&self, invoice_id: &str) -> Result<PaymentCheck, QPayError>;
}
