//! RoamWiFi eSIM provisioning partner
//!
//! - [`sign`]: parameter signing shared by every call
//! - [`types`]: loose wire decoding and normalized records
//! - [`client`]: HTTP client; authenticates afresh for every operation

pub mod client;
pub mod sign;
pub mod types;

use async_trait::async_trait;
use shared::models::Order;

pub use client::{PdfVoucherMailer, RoamWifiClient};
pub use types::{PartnerPackage, ProvisionRequest, Provisioned, Sku, SkuPackages};

#[derive(Debug, thiserror::Error)]
pub enum RoamWifiError {
    #[error("RoamWiFi request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("missing RoamWiFi credentials")]
    MissingCredentials,
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("API error: {message}")]
    Rejected { code: String, message: String },
    #[error("unexpected RoamWiFi response: {0}")]
    Decode(String),
}

impl RoamWifiError {
    /// Text kept on a failed order for support staff
    pub fn partner_message(&self) -> String {
        match self {
            RoamWifiError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// eSIM issuing side
#[async_trait]
pub trait ProvisioningPartner: Send + Sync {
    async fn list_skus(&self) -> Result<Vec<Sku>, RoamWifiError>;

    async fn get_packages(&self, sku_id: &str) -> Result<SkuPackages, RoamWifiError>;

    async fn create_order(&self, req: &ProvisionRequest) -> Result<Provisioned, RoamWifiError>;
}

/// Post-provisioning customer notification. Failures never affect the order.
#[async_trait]
pub trait DeliveryNotifier: Send + Sync {
    async fn notify(&self, order: &Order, provisioned: &Provisioned) -> Result<(), RoamWifiError>;
}

impl From<RoamWifiError> for shared::error::AppError {
    fn from(e: RoamWifiError) -> Self {
        use shared::error::ErrorCode;
        let code = match &e {
            RoamWifiError::Transport(err) if err.is_timeout() => ErrorCode::TimeoutError,
            RoamWifiError::Transport(_) => ErrorCode::UpstreamUnavailable,
            RoamWifiError::MissingCredentials | RoamWifiError::Auth(_) => {
                ErrorCode::PartnerAuthFailed
            }
            RoamWifiError::Rejected { .. } => ErrorCode::PartnerRejected,
            RoamWifiError::Decode(_) => ErrorCode::PartnerResponseInvalid,
        };
        shared::error::AppError::upstream(code, e.partner_message())
    }
}
