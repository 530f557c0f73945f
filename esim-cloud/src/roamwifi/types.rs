//! RoamWiFi wire types
//!
//! The partner mixes number and string encodings freely, so every scalar
//! that is not plain text is decoded as [`Loose`] and normalized here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::RoamWifiError;
use crate::loose::Loose;

/// `{code, message, data}` wrapper on every response
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub code: Option<Loose>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// `data` when `code` is one of `ok_codes`, otherwise the partner's message
    pub fn into_data(self, ok_codes: &[&str]) -> Result<Value, RoamWifiError> {
        match self.code {
            Some(ref code) if code.is_one_of(ok_codes) => Ok(self.data),
            code => {
                let code = code.map(|c| c.as_text()).unwrap_or_default();
                Err(RoamWifiError::Rejected {
                    message: self
                        .message
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| format!("code={code}")),
                    code,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sku {
    pub sku_id: i64,
    pub display: String,
    pub country_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSku {
    skuid: Option<Loose>,
    #[serde(default)]
    display: Option<String>,
    country_code: Option<Loose>,
}

pub(crate) fn parse_skus(data: Value) -> Result<Vec<Sku>, RoamWifiError> {
    let raw: Vec<RawSku> = serde_json::from_value(data)
        .map_err(|e| RoamWifiError::Decode(format!("sku list: {e}")))?;
    Ok(raw
        .into_iter()
        .filter_map(|r| {
            Some(Sku {
                sku_id: r.skuid?.as_i64()?,
                display: r.display.unwrap_or_default(),
                country_code: r.country_code.map(|c| c.as_text()).unwrap_or_default(),
            })
        })
        .collect())
}

/// One priced variant offered under a SKU
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartnerPackage {
    pub provider_price_id: i64,
    pub api_code: String,
    pub show_name: String,
    pub flows: Decimal,
    pub unit: String,
    pub days: i32,
    pub price_usd: Decimal,
    pub pid: Option<i64>,
    pub premark: Option<String>,
    pub expire_days: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkuPackages {
    pub sku_id: i64,
    pub display: String,
    pub display_en: String,
    pub country_code: String,
    pub support_countries: Vec<String>,
    pub packages: Vec<PartnerPackage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPackage {
    api_code: Option<String>,
    flows: Option<Loose>,
    unit: Option<String>,
    days: Option<Loose>,
    price: Option<Loose>,
    #[serde(rename = "priceid")]
    price_id: Option<Loose>,
    show_name: Option<String>,
    pid: Option<Loose>,
    premark: Option<String>,
    expire_days: Option<Loose>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSkuPackages {
    skuid: Option<Loose>,
    display: Option<String>,
    display_en: Option<String>,
    #[serde(rename = "countrycode")]
    country_code: Option<Loose>,
    #[serde(default)]
    support_country: Option<Vec<String>>,
    #[serde(default, rename = "esimPackageDtoList")]
    packages: Option<Vec<RawPackage>>,
}

impl RawPackage {
    fn normalize(self) -> Option<PartnerPackage> {
        let provider_price_id = self.price_id.as_ref().and_then(Loose::as_i64)?;
        let flows = self
            .flows
            .as_ref()
            .and_then(Loose::as_decimal)
            .unwrap_or_default();
        let unit = self.unit.unwrap_or_default();
        let days = self
            .days
            .as_ref()
            .and_then(Loose::as_i64)
            .and_then(|d| i32::try_from(d).ok())
            .unwrap_or_default();
        let show_name = self
            .show_name
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("{}{} {} days", flows.normalize(), unit, days));
        Some(PartnerPackage {
            provider_price_id,
            api_code: self.api_code.unwrap_or_default(),
            show_name,
            flows,
            unit,
            days,
            price_usd: self
                .price
                .as_ref()
                .and_then(Loose::as_decimal)
                .unwrap_or_default(),
            pid: self.pid.as_ref().and_then(Loose::as_i64),
            premark: self.premark.filter(|s| !s.is_empty()),
            expire_days: self
                .expire_days
                .as_ref()
                .and_then(Loose::as_i64)
                .and_then(|d| i32::try_from(d).ok()),
        })
    }
}

pub(crate) fn parse_sku_packages(data: Value) -> Result<SkuPackages, RoamWifiError> {
    let raw: RawSkuPackages = serde_json::from_value(data)
        .map_err(|e| RoamWifiError::Decode(format!("package list: {e}")))?;
    let packages = raw
        .packages
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| {
            let api_code = p.api_code.clone();
            let normalized = p.normalize();
            if normalized.is_none() {
                tracing::warn!(api_code = ?api_code, "Skipping partner package without priceid");
            }
            normalized
        })
        .collect();
    Ok(SkuPackages {
        sku_id: raw.skuid.as_ref().and_then(Loose::as_i64).unwrap_or_default(),
        display: raw.display.unwrap_or_default(),
        display_en: raw.display_en.unwrap_or_default(),
        country_code: raw.country_code.map(|c| c.as_text()).unwrap_or_default(),
        support_countries: raw.support_country.unwrap_or_default(),
        packages,
    })
}

/// Partner order request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub sku_id: String,
    pub package_id: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub quantity: u32,
}

/// Issued eSIM
#[derive(Debug, Clone, PartialEq)]
pub struct Provisioned {
    pub partner_order_id: String,
    pub status: String,
    pub qr_code: String,
    pub activation_code: String,
    /// Partner-specific delivery payload, opaque
    pub esim_data: Value,
}

impl Provisioned {
    /// Artifact stored on the order
    pub fn delivery_artifact(&self) -> Value {
        json!({
            "roamwifi_order_id": self.partner_order_id,
            "qr_code": self.qr_code,
            "activation_code": self.activation_code,
            "esim_data": self.esim_data,
        })
    }
}

fn first_text(data: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match data.get(*k)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

pub(crate) fn parse_provisioned(data: Value) -> Result<Provisioned, RoamWifiError> {
    if !data.is_object() {
        return Err(RoamWifiError::Decode("createOrder response has no data".into()));
    }
    let partner_order_id = first_text(&data, &["order_id", "orderId"])
        .ok_or_else(|| RoamWifiError::Decode("createOrder response has no order id".into()))?;
    Ok(Provisioned {
        partner_order_id,
        status: first_text(&data, &["status"]).unwrap_or_default(),
        qr_code: first_text(&data, &["qr_code", "qrcode"]).unwrap_or_default(),
        activation_code: first_text(&data, &["activation_code"]).unwrap_or_default(),
        esim_data: match data.get("esim_data") {
            Some(v @ Value::Object(_)) => v.clone(),
            _ => Value::Null,
        },
    })
}
