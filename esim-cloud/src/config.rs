//! Service configuration, read from the environment

use std::time::Duration;

use rust_decimal::Decimal;

use crate::BoxError;

/// QPay merchant settings
#[derive(Debug, Clone)]
pub struct QPayConfig {
    pub endpoint: String,
    pub merchant_id: String,
    pub password: String,
    /// Prefix of the per-invoice code (`{prefix}_{unix}`)
    pub invoice_code: String,
    pub callback_url: String,
    /// Reject webhooks that carry no `X-QPay-Signature` header
    pub require_signature: bool,
}

/// RoamWiFi partner settings
#[derive(Debug, Clone)]
pub struct RoamWifiConfig {
    pub api_url: String,
    pub phonenumber: String,
    pub password: String,
    /// Shared secret appended to every signed parameter string
    pub sign_key: String,
    /// Bearer key for the voucher email endpoint (optional)
    pub api_key: Option<String>,
}

/// Exchange rate and local pricing settings
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub rate_api_url: String,
    pub local_currency: String,
    pub fallback_rate: Decimal,
    /// Refuse new orders while only the hardcoded fallback rate is known
    pub strict_rate: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// HS256 secret for bearer tokens
    pub jwt_secret: String,
    /// Timeout applied to every outbound HTTP call
    pub http_timeout: Duration,
    pub qpay: QPayConfig,
    pub roamwifi: RoamWifiConfig,
    pub pricing: PricingConfig,
}

pub const DEFAULT_FALLBACK_RATE: i64 = 2850;
pub const DEFAULT_SIGN_KEY: &str = "ro@mw1f1-bpm-ap1";

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: env_parse("HTTP_PORT").unwrap_or(8080),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            http_timeout: Duration::from_secs(env_parse("HTTP_TIMEOUT_SECS").unwrap_or(30)),
            qpay: QPayConfig {
                endpoint: env_or("QPAY_ENDPOINT", "https://merchant.qpay.mn/v2"),
                merchant_id: Self::require_secret("QPAY_MERCHANT_ID", &environment)?,
                password: Self::require_secret("QPAY_PASSWORD", &environment)?,
                invoice_code: env_or("QPAY_INVOICE_CODE", "ESIM_INVOICE"),
                callback_url: env_or(
                    "QPAY_CALLBACK_URL",
                    "http://localhost:8080/api/webhooks/qpay",
                ),
                require_signature: env_flag("QPAY_REQUIRE_SIGNATURE"),
            },
            roamwifi: RoamWifiConfig {
                api_url: env_or("ROAMWIFI_API_URL", "http://bpm.roamwifi.com"),
                phonenumber: Self::require_secret("ROAMWIFI_PHONENUMBER", &environment)?,
                password: Self::require_secret("ROAMWIFI_PASSWORD", &environment)?,
                sign_key: env_or("ROAMWIFI_SIGN_KEY", DEFAULT_SIGN_KEY),
                api_key: std::env::var("ROAMWIFI_API_KEY")
                    .ok()
                    .filter(|s| !s.is_empty()),
            },
            pricing: PricingConfig {
                rate_api_url: env_or(
                    "RATE_API_URL",
                    "https://api.exchangerate-api.com/v4/latest/USD",
                ),
                local_currency: env_or("LOCAL_CURRENCY", "MNT"),
                fallback_rate: env_parse("FALLBACK_RATE")
                    .unwrap_or(Decimal::from(DEFAULT_FALLBACK_RATE)),
                strict_rate: env_flag("STRICT_RATE"),
            },
            environment,
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(false)
}
