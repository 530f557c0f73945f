//! RoamWiFi REST client
//!
//! Parameters travel as a signed query string on a POST. No token is kept
//! between calls: each operation logs in and threads the fresh token through.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Value, json};
use shared::models::Order;

use super::sign::signed;
use super::types::{Envelope, parse_provisioned, parse_sku_packages, parse_skus};
use super::{
    DeliveryNotifier, ProvisionRequest, Provisioned, ProvisioningPartner, RoamWifiError, Sku,
    SkuPackages,
};
use crate::config::RoamWifiConfig;

#[derive(Clone)]
pub struct RoamWifiClient {
    http: reqwest::Client,
    config: RoamWifiConfig,
}

fn params<const N: usize>(pairs: [(&str, String); N]) -> BTreeMap<String, String> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

impl RoamWifiClient {
    pub fn new(config: RoamWifiConfig, http: reqwest::Client) -> Self {
        Self { http, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    async fn signed_post(
        &self,
        path: &str,
        params: BTreeMap<String, String>,
    ) -> Result<Envelope, RoamWifiError> {
        let query = signed(params, &self.config.sign_key);
        let resp = self.http.post(self.url(path)).query(&query).send().await?;
        let body: Value = resp.json().await?;
        tracing::debug!(path, response = %body, "RoamWiFi response");
        serde_json::from_value(body).map_err(|e| RoamWifiError::Decode(e.to_string()))
    }

    /// Log in and return a session token for the next call
    pub async fn authenticate(&self) -> Result<String, RoamWifiError> {
        if self.config.phonenumber.is_empty() || self.config.password.is_empty() {
            return Err(RoamWifiError::MissingCredentials);
        }
        let envelope = self
            .signed_post(
                "/api_order/login",
                params([
                    ("phonenumber", self.config.phonenumber.clone()),
                    ("password", self.config.password.clone()),
                ]),
            )
            .await?;
        let message = envelope.message.clone().unwrap_or_default();
        envelope.data["token"]
            .as_str()
            .filter(|t| !t.is_empty())
            .map(String::from)
            .ok_or_else(|| RoamWifiError::Auth(format!("no token in login response: {message}")))
    }

    /// Ask the partner to email the voucher PDF
    pub async fn send_pdf_email(
        &self,
        partner_order_id: &str,
        email: &str,
    ) -> Result<(), RoamWifiError> {
        let mut req = self
            .http
            .post(self.url(&format!("/order/{partner_order_id}/send-pdf")))
            .json(&json!({ "email": email }));
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }
        let envelope: Envelope = req.send().await?.json().await?;
        envelope.into_data(&["200"]).map(|_| ())
    }
}

#[async_trait]
impl ProvisioningPartner for RoamWifiClient {
    async fn list_skus(&self) -> Result<Vec<Sku>, RoamWifiError> {
        let token = self.authenticate().await?;
        let data = self
            .signed_post("/api_esim/getSkus", params([("token", token)]))
            .await?
            .into_data(&["0"])?;
        parse_skus(data)
    }

    async fn get_packages(&self, sku_id: &str) -> Result<SkuPackages, RoamWifiError> {
        let token = self.authenticate().await?;
        let data = self
            .signed_post(
                "/api_esim/getPackages",
                params([("token", token), ("skuId", sku_id.to_string())]),
            )
            .await?
            .into_data(&["0", "200"])?;
        parse_sku_packages(data)
    }

    async fn create_order(&self, req: &ProvisionRequest) -> Result<Provisioned, RoamWifiError> {
        let token = self.authenticate().await?;
        let data = self
            .signed_post(
                "/api_order/createOrder",
                params([
                    ("token", token),
                    ("sku_id", req.sku_id.clone()),
                    ("package_id", req.package_id.clone()),
                    ("customer_email", req.customer_email.clone().unwrap_or_default()),
                    ("customer_phone", req.customer_phone.clone().unwrap_or_default()),
                    ("quantity", req.quantity.to_string()),
                ]),
            )
            .await?
            .into_data(&["0", "200"])?;
        let provisioned = parse_provisioned(data)?;
        tracing::info!(
            partner_order_id = %provisioned.partner_order_id,
            sku_id = %req.sku_id,
            package_id = %req.package_id,
            "RoamWiFi order created"
        );
        Ok(provisioned)
    }
}

/// Emails the partner's PDF voucher to the order's customer
pub struct PdfVoucherMailer {
    client: RoamWifiClient,
}

impl PdfVoucherMailer {
    pub fn new(client: RoamWifiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeliveryNotifier for PdfVoucherMailer {
    async fn notify(&self, order: &Order, provisioned: &Provisioned) -> Result<(), RoamWifiError> {
        let Some(email) = order.customer_email.as_deref().filter(|e| !e.is_empty()) else {
            return Ok(());
        };
        self.client
            .send_pdf_email(&provisioned.partner_order_id, email)
            .await
    }
}
