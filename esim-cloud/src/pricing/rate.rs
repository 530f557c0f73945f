//! Exchange rate resolution
//!
//! A stored rate younger than the freshness window is used as is. Otherwise
//! the feed is asked for a new one, which is appended to the history. When
//! the feed fails the last stored rate is used regardless of age, and with
//! no history at all the configured fallback applies. `get_rate` never fails.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{CurrencyRate, RateSource};
use uuid::Uuid;

use crate::loose::Loose;
use crate::store::{RateStore, StoreResult};
use crate::util::now_millis;

/// Stored rates older than this are refreshed
pub const RATE_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

const FEED_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum RateFetchError {
    #[error("rate feed request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rate feed returned HTTP {0}")]
    Status(u16),
    #[error("rate feed has no usable {0} rate")]
    Missing(String),
}

/// Source of fresh exchange rates
#[async_trait]
pub trait RateFeed: Send + Sync {
    async fn fetch(&self, from: &str, to: &str) -> Result<Decimal, RateFetchError>;
}

/// exchangerate-api.com style feed (`conversion_rates` on v6, `rates` on v4)
pub struct ExchangeRateApi {
    http: reqwest::Client,
    url: String,
}

impl ExchangeRateApi {
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(FEED_TIMEOUT).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

/// Pull `to` out of a feed document
fn extract_rate(body: &serde_json::Value, to: &str) -> Option<Decimal> {
    ["conversion_rates", "rates"]
        .iter()
        .filter_map(|table| body.get(table)?.get(to))
        .find_map(|v| serde_json::from_value::<Loose>(v.clone()).ok()?.as_decimal())
        .filter(|r| *r > Decimal::ZERO)
}

#[async_trait]
impl RateFeed for ExchangeRateApi {
    async fn fetch(&self, _from: &str, to: &str) -> Result<Decimal, RateFetchError> {
        let resp = self.http.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RateFetchError::Status(status.as_u16()));
        }
        let body: serde_json::Value = resp.json().await?;
        extract_rate(&body, to).ok_or_else(|| RateFetchError::Missing(to.to_string()))
    }
}

/// How the returned rate was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateOrigin {
    /// Stored and within the freshness window
    Cached,
    /// Fetched from the feed just now
    Fetched,
    /// Stored but past the window; the feed failed
    Stale,
    /// Nothing stored and the feed failed
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateResolution {
    pub rate: Decimal,
    pub origin: RateOrigin,
}

#[derive(Clone)]
pub struct RateResolver {
    store: Arc<dyn RateStore>,
    feed: Arc<dyn RateFeed>,
    fallback: Decimal,
    max_age_ms: i64,
}

impl RateResolver {
    pub fn new(store: Arc<dyn RateStore>, feed: Arc<dyn RateFeed>, fallback: Decimal) -> Self {
        Self {
            store,
            feed,
            fallback,
            max_age_ms: RATE_MAX_AGE.as_millis() as i64,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age_ms = max_age.as_millis() as i64;
        self
    }

    pub async fn get_rate(&self, from: &str, to: &str) -> RateResolution {
        let stored = match self.store.latest_rate(from, to).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, from, to, "Failed to read stored rate");
                None
            }
        };

        let now = now_millis();
        if let Some(ref r) = stored
            && now - r.created_at < self.max_age_ms
        {
            return RateResolution {
                rate: r.rate,
                origin: RateOrigin::Cached,
            };
        }

        match self.feed.fetch(from, to).await {
            Ok(rate) => {
                let row = new_rate(from, to, rate, RateSource::Api, now);
                if let Err(e) = self.store.append_rate(&row).await {
                    tracing::warn!(error = %e, from, to, "Failed to store fetched rate");
                }
                tracing::info!(from, to, %rate, "Exchange rate refreshed");
                RateResolution {
                    rate,
                    origin: RateOrigin::Fetched,
                }
            }
            Err(e) => match stored {
                Some(r) => {
                    tracing::warn!(error = %e, from, to, rate = %r.rate, "Rate feed failed, using stale rate");
                    RateResolution {
                        rate: r.rate,
                        origin: RateOrigin::Stale,
                    }
                }
                None => {
                    tracing::warn!(error = %e, from, to, rate = %self.fallback, "Rate feed failed, using fallback rate");
                    RateResolution {
                        rate: self.fallback,
                        origin: RateOrigin::Fallback,
                    }
                }
            },
        }
    }

    /// Record an operator-supplied rate; it becomes the latest immediately
    pub async fn set_manual_rate(
        &self,
        from: &str,
        to: &str,
        rate: Decimal,
    ) -> StoreResult<CurrencyRate> {
        let row = new_rate(from, to, rate, RateSource::Manual, now_millis());
        self.store.append_rate(&row).await?;
        tracing::info!(from, to, %rate, "Manual exchange rate recorded");
        Ok(row)
    }
}

fn new_rate(from: &str, to: &str, rate: Decimal, source: RateSource, now: i64) -> CurrencyRate {
    CurrencyRate {
        id: Uuid::new_v4(),
        from_currency: from.to_string(),
        to_currency: to.to_string(),
        rate,
        source,
        created_at: now,
    }
}
