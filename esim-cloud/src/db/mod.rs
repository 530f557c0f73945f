//! PostgreSQL store
//!
//! Per-table query functions taking `&PgPool`, and [`PgStore`] wiring them
//! into the persistence traits.

pub mod currency_rates;
pub mod orders;
pub mod package_prices;
pub mod payment_transactions;
pub mod products;

use async_trait::async_trait;
use shared::models::{CurrencyRate, Order, OrderStatus, PackagePrice, PaymentTransaction, Product};
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{
    CatalogStore, OrderFilter, OrderStore, RateStore, StoreResult, ensure_transition,
};
use crate::util::now_millis;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        orders::insert(&self.pool, order).await
    }

    async fn find_order(&self, order_id: Uuid) -> StoreResult<Option<Order>> {
        orders::find(&self.pool, order_id).await
    }

    async fn find_order_by_number(&self, order_number: &str) -> StoreResult<Option<Order>> {
        orders::find_by_number(&self.pool, order_number).await
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        orders::list(&self.pool, filter).await
    }

    async fn transition_status(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreResult<bool> {
        ensure_transition(from, to)?;
        Ok(orders::transition(&self.pool, order_id, from, to, now_millis()).await?)
    }

    async fn complete_order(
        &self,
        order_id: Uuid,
        partner_order_id: &str,
        esim_data: &serde_json::Value,
    ) -> StoreResult<bool> {
        Ok(orders::complete(&self.pool, order_id, partner_order_id, esim_data, now_millis()).await?)
    }

    async fn fail_order(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        reason: &str,
    ) -> StoreResult<bool> {
        ensure_transition(from, OrderStatus::Failed)?;
        Ok(orders::fail(&self.pool, order_id, from, reason, now_millis()).await?)
    }

    async fn set_invoice_id(&self, order_id: Uuid, invoice_id: &str) -> StoreResult<()> {
        Ok(orders::set_invoice_id(&self.pool, order_id, invoice_id, now_millis()).await?)
    }

    async fn upsert_transaction(&self, tx: &PaymentTransaction) -> StoreResult<bool> {
        Ok(payment_transactions::upsert(&self.pool, tx).await?)
    }

    async fn find_transaction(&self, order_id: Uuid) -> StoreResult<Option<PaymentTransaction>> {
        Ok(payment_transactions::find_by_order(&self.pool, order_id).await?)
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn find_product(&self, product_id: Uuid) -> StoreResult<Option<Product>> {
        Ok(products::find(&self.pool, product_id).await?)
    }

    async fn find_package_price(&self, id: Uuid) -> StoreResult<Option<PackagePrice>> {
        Ok(package_prices::find(&self.pool, id).await?)
    }

    async fn find_package_by_provider_id(
        &self,
        provider_price_id: i64,
    ) -> StoreResult<Option<PackagePrice>> {
        Ok(package_prices::find_by_provider_id(&self.pool, provider_price_id).await?)
    }

    async fn list_package_prices(&self, sku_id: &str) -> StoreResult<Vec<PackagePrice>> {
        Ok(package_prices::list_by_sku(&self.pool, sku_id).await?)
    }

    async fn save_package_price(&self, price: &PackagePrice) -> StoreResult<()> {
        Ok(package_prices::save(&self.pool, price).await?)
    }

    async fn deactivate_missing(&self, sku_id: &str, keep: &[i64], now: i64) -> StoreResult<u64> {
        Ok(package_prices::deactivate_missing(&self.pool, sku_id, keep, now).await?)
    }
}

#[async_trait]
impl RateStore for PgStore {
    async fn latest_rate(&self, from: &str, to: &str) -> StoreResult<Option<CurrencyRate>> {
        Ok(currency_rates::latest(&self.pool, from, to).await?)
    }

    async fn append_rate(&self, rate: &CurrencyRate) -> StoreResult<()> {
        Ok(currency_rates::append(&self.pool, rate).await?)
    }
}
