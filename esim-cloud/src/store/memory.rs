//! In-process store
//!
//! One mutex guards every map, so each trait call is atomic with respect to
//! the others, the same guarantee the conditional `UPDATE`s give in
//! PostgreSQL.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use shared::models::{
    CurrencyRate, Order, OrderStatus, PackagePrice, PaymentStatus, PaymentTransaction, Product,
};
use uuid::Uuid;

use super::{
    CatalogStore, OrderFilter, OrderStore, RateStore, StoreError, StoreResult, ensure_transition,
};
use crate::util::now_millis;

#[derive(Default)]
struct Inner {
    orders: HashMap<Uuid, Order>,
    order_numbers: HashMap<String, Uuid>,
    /// Keyed by order id (one transaction per order)
    transactions: HashMap<Uuid, PaymentTransaction>,
    products: HashMap<Uuid, Product>,
    package_prices: HashMap<Uuid, PackagePrice>,
    rates: Vec<CurrencyRate>,
}

/// Shallow merge of JSON objects, the same as PostgreSQL's `jsonb || jsonb`
fn merge_data(stored: &mut Value, incoming: &Value) {
    if let (Some(stored), Some(incoming)) = (stored.as_object_mut(), incoming.as_object()) {
        for (key, value) in incoming {
            stored.insert(key.clone(), value.clone());
        }
        return;
    }
    *stored = incoming.clone();
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&self, product: Product) {
        self.inner.lock().products.insert(product.id, product);
    }

    pub fn order(&self, order_id: Uuid) -> Option<Order> {
        self.inner.lock().orders.get(&order_id).cloned()
    }

    pub fn order_count(&self) -> usize {
        self.inner.lock().orders.len()
    }

    pub fn rate_count(&self) -> usize {
        self.inner.lock().rates.len()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        if inner.order_numbers.contains_key(&order.order_number) {
            return Err(StoreError::Duplicate(order.order_number.clone()));
        }
        inner
            .order_numbers
            .insert(order.order_number.clone(), order.id);
        inner.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_order(&self, order_id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.inner.lock().orders.get(&order_id).cloned())
    }

    async fn find_order_by_number(&self, order_number: &str) -> StoreResult<Option<Order>> {
        let inner = self.inner.lock();
        Ok(inner
            .order_numbers
            .get(order_number)
            .and_then(|id| inner.orders.get(id))
            .cloned())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let inner = self.inner.lock();
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let (limit, offset) = filter.page();
        Ok(orders
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn transition_status(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreResult<bool> {
        ensure_transition(from, to)?;
        let mut inner = self.inner.lock();
        match inner.orders.get_mut(&order_id) {
            Some(order) if order.status == from => {
                order.status = to;
                order.updated_at = now_millis();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete_order(
        &self,
        order_id: Uuid,
        partner_order_id: &str,
        esim_data: &serde_json::Value,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        match inner.orders.get_mut(&order_id) {
            Some(order) if order.status == OrderStatus::Processing => {
                order.status = OrderStatus::Completed;
                order.partner_order_id = Some(partner_order_id.to_string());
                order.esim_data = Some(esim_data.clone());
                order.updated_at = now_millis();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fail_order(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        reason: &str,
    ) -> StoreResult<bool> {
        ensure_transition(from, OrderStatus::Failed)?;
        let mut inner = self.inner.lock();
        match inner.orders.get_mut(&order_id) {
            Some(order) if order.status == from => {
                order.status = OrderStatus::Failed;
                order.failure_reason = Some(reason.to_string());
                order.updated_at = now_millis();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_invoice_id(&self, order_id: Uuid, invoice_id: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        if let Some(order) = inner.orders.get_mut(&order_id) {
            order.invoice_id = Some(invoice_id.to_string());
            order.updated_at = now_millis();
        }
        Ok(())
    }

    async fn upsert_transaction(&self, tx: &PaymentTransaction) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        let existing = match inner.transactions.entry(tx.order_id) {
            Entry::Vacant(slot) => {
                slot.insert(tx.clone());
                return Ok(true);
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };
        if existing.status == PaymentStatus::Paid && tx.status != PaymentStatus::Paid {
            return Ok(false);
        }
        let mut data = std::mem::take(&mut existing.transaction_data);
        merge_data(&mut data, &tx.transaction_data);
        *existing = PaymentTransaction {
            id: existing.id,
            created_at: existing.created_at,
            transaction_data: data,
            ..tx.clone()
        };
        Ok(true)
    }

    async fn find_transaction(&self, order_id: Uuid) -> StoreResult<Option<PaymentTransaction>> {
        Ok(self.inner.lock().transactions.get(&order_id).cloned())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find_product(&self, product_id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.inner.lock().products.get(&product_id).cloned())
    }

    async fn find_package_price(&self, id: Uuid) -> StoreResult<Option<PackagePrice>> {
        Ok(self.inner.lock().package_prices.get(&id).cloned())
    }

    async fn find_package_by_provider_id(
        &self,
        provider_price_id: i64,
    ) -> StoreResult<Option<PackagePrice>> {
        Ok(self
            .inner
            .lock()
            .package_prices
            .values()
            .find(|p| p.provider_price_id == provider_price_id)
            .cloned())
    }

    async fn list_package_prices(&self, sku_id: &str) -> StoreResult<Vec<PackagePrice>> {
        let inner = self.inner.lock();
        let mut prices: Vec<PackagePrice> = inner
            .package_prices
            .values()
            .filter(|p| p.sku_id == sku_id)
            .cloned()
            .collect();
        prices.sort_by_key(|p| p.provider_price_id);
        Ok(prices)
    }

    async fn save_package_price(&self, price: &PackagePrice) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        inner
            .package_prices
            .retain(|_, p| p.provider_price_id != price.provider_price_id || p.id == price.id);
        inner.package_prices.insert(price.id, price.clone());
        Ok(())
    }

    async fn deactivate_missing(&self, sku_id: &str, keep: &[i64], now: i64) -> StoreResult<u64> {
        let mut inner = self.inner.lock();
        let mut count = 0;
        for price in inner.package_prices.values_mut() {
            if price.sku_id == sku_id && price.active && !keep.contains(&price.provider_price_id)
            {
                price.active = false;
                price.updated_at = now;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl RateStore for MemoryStore {
    async fn latest_rate(&self, from: &str, to: &str) -> StoreResult<Option<CurrencyRate>> {
        // Appended in time order; the last match is the newest
        Ok(self
            .inner
            .lock()
            .rates
            .iter()
            .rev()
            .find(|r| r.from_currency == from && r.to_currency == to)
            .cloned())
    }

    async fn append_rate(&self, rate: &CurrencyRate) -> StoreResult<()> {
        self.inner.lock().rates.push(rate.clone());
        Ok(())
    }
}
