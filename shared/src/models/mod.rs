//! Data models
//!
//! Shared between the service, its persistence layer and API clients.
//! Timestamps are Unix milliseconds, money is [`rust_decimal::Decimal`].

pub mod currency_rate;
pub mod order;
pub mod package_price;
pub mod payment;
pub mod product;

// Re-exports
pub use currency_rate::*;
pub use order::*;
pub use package_price::*;
pub use payment::*;
pub use product::*;
