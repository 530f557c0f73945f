//! QPay merchant REST client (no SDK dependency)

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use shared::models::PaymentStatus;

use super::{Invoice, InvoiceGateway, InvoiceRequest, PaymentCheck, QPayError};
use crate::config::QPayConfig;
use crate::loose::Loose;
use crate::util::md5_hex;

pub struct QPayClient {
    http: reqwest::Client,
    config: QPayConfig,
}

#[derive(Serialize)]
struct CreateInvoiceBody<'a> {
    merchant_id: &'a str,
    invoice_code: String,
    sender_invoice_no: &'a str,
    invoice_receiver: &'a str,
    invoice_description: &'a str,
    amount: i64,
    callback_url: &'a str,
}

impl QPayClient {
    pub fn new(config: QPayConfig, http: reqwest::Client) -> Self {
        Self { http, config }
    }

    /// POST `path` and unwrap the `{code, message, data}` envelope
    async fn call(&self, path: &str, body: &impl Serialize) -> Result<Value, QPayError> {
        let url = format!("{}{}", self.config.endpoint.trim_end_matches('/'), path);
        let resp: Value = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await?
            .json()
            .await?;
        tracing::debug!(%url, response = %resp, "QPay response");
        unwrap_envelope(resp)
    }
}

fn unwrap_envelope(resp: Value) -> Result<Value, QPayError> {
    let code = resp
        .get("code")
        .cloned()
        .and_then(|c| serde_json::from_value::<Loose>(c).ok())
        .ok_or_else(|| QPayError::Decode(format!("missing code in {resp}")))?;
    if !code.is_one_of(&["0"]) {
        let message = resp["message"].as_str().unwrap_or_default().to_string();
        return Err(QPayError::Rejected {
            code: code.as_text(),
            message,
        });
    }
    Ok(resp.get("data").cloned().unwrap_or(Value::Null))
}

fn text(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_invoice(data: &Value) -> Result<Invoice, QPayError> {
    let invoice_id = text(data, "invoice_id")
        .filter(|s| !s.is_empty())
        .ok_or_else(|| QPayError::Decode("invoice response has no invoice_id".into()))?;
    let urls = data.get("urls").cloned().unwrap_or(Value::Null);
    Ok(Invoice {
        invoice_id,
        qr_code: text(data, "qr_code").unwrap_or_default(),
        web_url: text(&urls, "web").unwrap_or_default(),
        app_url: text(&urls, "app").unwrap_or_default(),
    })
}

fn parse_check(data: &Value) -> Result<PaymentCheck, QPayError> {
    let provider_status = text(data, "payment_status")
        .ok_or_else(|| QPayError::Decode("payment check has no payment_status".into()))?;
    let paid_amount = data
        .get("paid_amount")
        .cloned()
        .and_then(|v| serde_json::from_value::<Loose>(v).ok())
        .and_then(|l| l.as_decimal());
    Ok(PaymentCheck {
        invoice_id: text(data, "invoice_id").unwrap_or_default(),
        transaction_id: text(data, "transaction_id").filter(|s| !s.is_empty()),
        status: PaymentStatus::from_provider(&provider_status),
        provider_status,
        paid_amount,
        payment_date: text(data, "payment_date"),
    })
}

#[async_trait]
impl InvoiceGateway for QPayClient {
    async fn create_invoice(&self, req: &InvoiceRequest) -> Result<Invoice, QPayError> {
        let body = CreateInvoiceBody {
            merchant_id: &self.config.merchant_id,
            invoice_code: format!(
                "{}_{}",
                self.config.invoice_code,
                chrono::Utc::now().timestamp()
            ),
            sender_invoice_no: &req.order_number,
            invoice_receiver: &req.receiver,
            invoice_description: &req.description,
            amount: req.amount,
            callback_url: &self.config.callback_url,
        };
        let data = self.call("/invoice", &body).await?;
        let invoice = parse_invoice(&data)?;
        tracing::info!(
            order_number = %req.order_number,
            invoice_id = %invoice.invoice_id,
            amount = req.amount,
            "QPay invoice created"
        );
        Ok(invoice)
    }

    async fn check_payment(&self, invoice_id: &str) -> Result<PaymentCheck, QPayError> {
        let body = json!({
            "merchant_id": self.config.merchant_id,
            "invoice_id": invoice_id,
            "check_password": md5_hex(&self.config.password),
        });
        let data = self.call("/payment/check", &body).await?;
        parse_check(&data)
    }
}
