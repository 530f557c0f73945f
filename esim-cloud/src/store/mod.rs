//! Persistence seams
//!
//! The orchestrator, the catalog service and the rate resolver only see
//! these traits. [`crate::db::PgStore`] backs them with PostgreSQL;
//! [`memory::MemoryStore`] keeps everything in process for tests and local
//! runs. Both honour the same conditional-update semantics.

pub mod memory;

use async_trait::async_trait;
use serde::Deserialize;
use shared::models::{CurrencyRate, Order, OrderStatus, PackagePrice, PaymentTransaction, Product};
use uuid::Uuid;

pub use memory::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Unique key already taken (e.g. order number)
    #[error("duplicate key: {0}")]
    Duplicate(String),
    /// Stored value cannot be mapped back to the model
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("illegal order transition {from} -> {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Refuse status moves the order state machine does not allow
pub fn ensure_transition(from: OrderStatus, to: OrderStatus) -> StoreResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(StoreError::IllegalTransition { from, to })
    }
}

/// Largest page `list_orders` returns
pub const MAX_PAGE_SIZE: i64 = 500;

/// Admin order listing filter
#[derive(Debug, Clone, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

impl OrderFilter {
    /// `(limit, offset)` clamped to `1..=MAX_PAGE_SIZE` and `0..`
    pub fn page(&self) -> (i64, i64) {
        (self.limit.clamp(1, MAX_PAGE_SIZE), self.offset.max(0))
    }
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the order number is taken
    async fn insert_order(&self, order: &Order) -> StoreResult<()>;

    async fn find_order(&self, order_id: Uuid) -> StoreResult<Option<Order>>;

    async fn find_order_by_number(&self, order_number: &str) -> StoreResult<Option<Order>>;

    /// Newest first
    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>>;

    /// Move `from -> to` only if the order is currently `from`.
    /// Returns whether this call performed the transition; a pair the state
    /// machine forbids is [`StoreError::IllegalTransition`].
    async fn transition_status(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreResult<bool>;

    /// `processing -> completed`, recording the partner order and delivery artifact
    async fn complete_order(
        &self,
        order_id: Uuid,
        partner_order_id: &str,
        esim_data: &serde_json::Value,
    ) -> StoreResult<bool>;

    /// `from -> failed`, recording the reason
    async fn fail_order(&self, order_id: Uuid, from: OrderStatus, reason: &str)
    -> StoreResult<bool>;

    async fn set_invoice_id(&self, order_id: Uuid, invoice_id: &str) -> StoreResult<()>;

    /// Insert or update the order's transaction in one atomic step.
    ///
    /// An existing row keeps its `id` and `created_at`, and `transaction_data`
    /// keys are merged into the stored object. A `paid` row is only
    /// overwritten by another `paid` status. Returns whether the row was written.
    async fn upsert_transaction(&self, tx: &PaymentTransaction) -> StoreResult<bool>;

    async fn find_transaction(&self, order_id: Uuid) -> StoreResult<Option<PaymentTransaction>>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_product(&self, product_id: Uuid) -> StoreResult<Option<Product>>;

    async fn find_package_price(&self, id: Uuid) -> StoreResult<Option<PackagePrice>>;

    async fn find_package_by_provider_id(
        &self,
        provider_price_id: i64,
    ) -> StoreResult<Option<PackagePrice>>;

    async fn list_package_prices(&self, sku_id: &str) -> StoreResult<Vec<PackagePrice>>;

    /// Insert or update, keyed by `provider_price_id`
    async fn save_package_price(&self, price: &PackagePrice) -> StoreResult<()>;

    /// Deactivate every active row of `sku_id` whose provider id is not in `keep`
    async fn deactivate_missing(&self, sku_id: &str, keep: &[i64], now: i64) -> StoreResult<u64>;
}

#[async_trait]
pub trait RateStore: Send + Sync {
    async fn latest_rate(&self, from: &str, to: &str) -> StoreResult<Option<CurrencyRate>>;

    /// Rates are append-only
    async fn append_rate(&self, rate: &CurrencyRate) -> StoreResult<()>;
}
