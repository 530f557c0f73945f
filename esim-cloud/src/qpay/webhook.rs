//! QPay payment webhook ingress
//!
//! Turns the notification body into a [`PaymentEvent`]. All seven fields are
//! required; amounts may arrive as numbers or numeric strings.
//!
//! Signature: lowercase hex MD5 of
//! `{invoice_id}{amount:.2}{payment_status}{merchant_password}`, sent in the
//! `X-QPay-Signature` header.

use rust_decimal::Decimal;
use serde_json::Value;
use shared::models::PaymentStatus;

use crate::loose::Loose;
use crate::util::md5_hex;

pub const SIGNATURE_HEADER: &str = "X-QPay-Signature";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    #[error("malformed webhook body: {0}")]
    Malformed(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid value for {0}")]
    InvalidField(&'static str),
    #[error("webhook signature missing")]
    SignatureMissing,
    #[error("webhook signature mismatch")]
    SignatureInvalid,
}

/// Canonical payment notification
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub invoice_id: String,
    /// `sender_invoice_no`, our order number
    pub order_number: String,
    pub transaction_id: String,
    pub status: PaymentStatus,
    pub provider_status: String,
    pub amount: Decimal,
    pub paid_amount: Decimal,
    pub payment_date: String,
}

fn required_text(body: &Value, key: &'static str) -> Result<String, WebhookError> {
    let value = body.get(key).ok_or(WebhookError::MissingField(key))?;
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => return Err(WebhookError::MissingField(key)),
        _ => return Err(WebhookError::InvalidField(key)),
    };
    if text.is_empty() {
        return Err(WebhookError::MissingField(key));
    }
    Ok(text)
}

fn required_amount(body: &Value, key: &'static str) -> Result<Decimal, WebhookError> {
    match body.get(key) {
        None | Some(Value::Null) => Err(WebhookError::MissingField(key)),
        Some(v) => serde_json::from_value::<Loose>(v.clone())
            .ok()
            .and_then(|l| l.as_decimal())
            .ok_or(WebhookError::InvalidField(key)),
    }
}

impl PaymentEvent {
    pub fn from_slice(body: &[u8]) -> Result<Self, WebhookError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| WebhookError::Malformed(e.to_string()))?;
        Self::from_value(&value)
    }

    pub fn from_value(body: &Value) -> Result<Self, WebhookError> {
        if !body.is_object() {
            return Err(WebhookError::Malformed("expected a JSON object".into()));
        }
        let provider_status = required_text(body, "payment_status")?;
        Ok(Self {
            invoice_id: required_text(body, "invoice_id")?,
            order_number: required_text(body, "sender_invoice_no")?,
            transaction_id: required_text(body, "transaction_id")?,
            status: PaymentStatus::from_provider(&provider_status),
            amount: required_amount(body, "amount")?,
            paid_amount: required_amount(body, "paid_amount")?,
            payment_date: required_text(body, "payment_date")?,
            provider_status,
        })
    }
}

/// Expected signature for an event
pub fn signature(event: &PaymentEvent, password: &str) -> String {
    md5_hex(&format!(
        "{}{:.2}{}{}",
        event.invoice_id, event.amount, event.provider_status, password
    ))
}

/// Check the signature header.
///
/// A present header must match. An absent one is accepted unless `require`
/// is set.
pub fn verify_signature(
    event: &PaymentEvent,
    header: Option<&str>,
    password: &str,
    require: bool,
) -> Result<(), WebhookError> {
    match header.map(str::trim).filter(|h| !h.is_empty()) {
        Some(sig) if sig.eq_ignore_ascii_case(&signature(event, password)) => Ok(()),
        Some(_) => Err(WebhookError::SignatureInvalid),
        None if require => Err(WebhookError::SignatureMissing),
        None => Ok(()),
    }
}
