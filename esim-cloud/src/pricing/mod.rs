//! Pricing
//!
//! - [`resolve`]: effective price of a package (override > markup > raw)
//! - [`rate`]: USD to local currency rate with a freshness window and fallbacks

pub mod rate;
pub mod resolve;

pub use rate::{ExchangeRateApi, RateFeed, RateFetchError, RateOrigin, RateResolution, RateResolver};
pub use resolve::{
    EffectivePrice, MAX_MARKUP_PERCENT, PricingError, apply_markup, apply_override, recompute,
    resolve_effective_price,
};
