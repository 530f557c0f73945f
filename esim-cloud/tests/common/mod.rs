//! Fixtures and counting doubles for the orchestrator tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use esim_cloud::config::{Config, PricingConfig, QPayConfig, RoamWifiConfig};
use esim_cloud::error::ServiceError;
use esim_cloud::orders::{OrderService, OrderSettings};
use esim_cloud::pricing::{RateFeed, RateFetchError, RateResolver, apply_markup};
use esim_cloud::qpay::{
    Invoice, InvoiceGateway, InvoiceRequest, PaymentCheck, PaymentEvent, QPayError,
};
use esim_cloud::roamwifi::{
    DeliveryNotifier, PartnerPackage, ProvisionRequest, Provisioned, ProvisioningPartner,
    RoamWifiError, Sku, SkuPackages,
};
use esim_cloud::state::Parts;
use esim_cloud::store::{
    CatalogStore, MemoryStore, OrderFilter, OrderStore, RateStore, StoreError, StoreResult,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use shared::error::ErrorCode;
use shared::models::{
    CurrencyRate, Order, OrderStatus, PackagePrice, PaymentStatus, PaymentTransaction, PriceSource,
    Product, RateSource,
};
use uuid::Uuid;

pub const SKU: &str = "114";
pub const PROVIDER_PRICE_ID: i64 = 9001;
pub const PASSWORD: &str = "qpay-secret";
pub const JWT_SECRET: &str = "jwt-test-secret";

// ========== Invoice gateway ==========

#[derive(Default)]
pub struct MockGateway {
    pub invoices: Mutex<Vec<InvoiceRequest>>,
    pub fail_with: Mutex<Option<String>>,
    /// Status reported by `check_payment`
    pub check_status: Mutex<Option<PaymentStatus>>,
    pub checks: AtomicUsize,
}

impl MockGateway {
    pub fn invoice_count(&self) -> usize {
        self.invoices.lock().len()
    }

    pub fn last_invoice(&self) -> Option<InvoiceRequest> {
        self.invoices.lock().last().cloned()
    }
}

#[async_trait]
impl InvoiceGateway for MockGateway {
    async fn create_invoice(&self, req: &InvoiceRequest) -> Result<Invoice, QPayError> {
        if let Some(message) = self.fail_with.lock().clone() {
            return Err(QPayError::Rejected {
                code: "1".into(),
                message,
            });
        }
        let mut invoices = self.invoices.lock();
        invoices.push(req.clone());
        let n = invoices.len();
        Ok(Invoice {
            invoice_id: format!("INV-{n}"),
            qr_code: format!("QR-{n}"),
            web_url: format!("https://qpay.test/pay/{n}"),
            app_url: format!("qpay://pay/{n}"),
        })
    }

    async fn check_payment(&self, invoice_id: &str) -> Result<PaymentCheck, QPayError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        let status = (*self.check_status.lock()).unwrap_or(PaymentStatus::Pending);
        Ok(PaymentCheck {
            invoice_id: invoice_id.to_string(),
            transaction_id: Some("TX-CHECK".into()),
            status,
            provider_status: status.as_str().to_ascii_uppercase(),
            paid_amount: None,
            payment_date: None,
        })
    }
}

// ========== Provisioning partner ==========

pub struct MockPartner {
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<ProvisionRequest>>,
    pub fail_with: Mutex<Option<String>>,
    pub packages: Mutex<Vec<PartnerPackage>>,
    /// Widens the race window in concurrency tests
    pub latency: Duration,
}

impl MockPartner {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            fail_with: Mutex::new(None),
            packages: Mutex::new(Vec::new()),
            latency: Duration::from_millis(20),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProvisioningPartner for MockPartner {
    async fn list_skus(&self) -> Result<Vec<Sku>, RoamWifiError> {
        Ok(vec![Sku {
            sku_id: 114,
            display: "Japan".into(),
            country_code: "392".into(),
        }])
    }

    async fn get_packages(&self, sku_id: &str) -> Result<SkuPackages, RoamWifiError> {
        Ok(SkuPackages {
            sku_id: sku_id.parse().unwrap_or_default(),
            display: "Japan".into(),
            display_en: "Japan".into(),
            country_code: "392".into(),
            support_countries: vec!["JP".into()],
            packages: self.packages.lock().clone(),
        })
    }

    async fn create_order(&self, req: &ProvisionRequest) -> Result<Provisioned, RoamWifiError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().push(req.clone());
        tokio::time::sleep(self.latency).await;
        if let Some(message) = self.fail_with.lock().clone() {
            return Err(RoamWifiError::Rejected {
                code: "1005".into(),
                message,
            });
        }
        Ok(Provisioned {
            partner_order_id: format!("RW-{n}"),
            status: "success".into(),
            qr_code: "LPA:1$rsp.test$CODE".into(),
            activation_code: "CODE".into(),
            esim_data: json!({"iccid": "8997600000000000001"}),
        })
    }
}

/// Forwards each notified partner order id to a channel
pub struct ChannelNotifier(pub tokio::sync::mpsc::UnboundedSender<String>);

#[async_trait]
impl DeliveryNotifier for ChannelNotifier {
    async fn notify(
        &self,
        _order: &shared::models::Order,
        provisioned: &Provisioned,
    ) -> Result<(), RoamWifiError> {
        let _ = self.0.send(provisioned.partner_order_id.clone());
        Ok(())
    }
}

// ========== Faulty store ==========

/// Delegates to a [`MemoryStore`] with injectable delays and failures
pub struct FaultyStore {
    pub inner: Arc<MemoryStore>,
    /// Applied before each non-paid transaction write
    pub upsert_delay: Duration,
    pub fail_find_product: AtomicBool,
    pub fail_complete: AtomicBool,
}

impl FaultyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            upsert_delay: Duration::ZERO,
            fail_find_product: AtomicBool::new(false),
            fail_complete: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl OrderStore for FaultyStore {
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        self.inner.insert_order(order).await
    }

    async fn find_order(&self, order_id: Uuid) -> StoreResult<Option<Order>> {
        self.inner.find_order(order_id).await
    }

    async fn find_order_by_number(&self, order_number: &str) -> StoreResult<Option<Order>> {
        self.inner.find_order_by_number(order_number).await
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        self.inner.list_orders(filter).await
    }

    async fn transition_status(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreResult<bool> {
        self.inner.transition_status(order_id, from, to).await
    }

    async fn complete_order(
        &self,
        order_id: Uuid,
        partner_order_id: &str,
        esim_data: &serde_json::Value,
    ) -> StoreResult<bool> {
        if self.fail_complete.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt("connection reset".into()));
        }
        self.inner.complete_order(order_id, partner_order_id, esim_data).await
    }

    async fn fail_order(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        reason: &str,
    ) -> StoreResult<bool> {
        self.inner.fail_order(order_id, from, reason).await
    }

    async fn set_invoice_id(&self, order_id: Uuid, invoice_id: &str) -> StoreResult<()> {
        self.inner.set_invoice_id(order_id, invoice_id).await
    }

    async fn upsert_transaction(&self, tx: &PaymentTransaction) -> StoreResult<bool> {
        if tx.status != PaymentStatus::Paid {
            tokio::time::sleep(self.upsert_delay).await;
        }
        self.inner.upsert_transaction(tx).await
    }

    async fn find_transaction(&self, order_id: Uuid) -> StoreResult<Option<PaymentTransaction>> {
        self.inner.find_transaction(order_id).await
    }
}

#[async_trait]
impl CatalogStore for FaultyStore {
    async fn find_product(&self, product_id: Uuid) -> StoreResult<Option<Product>> {
        if self.fail_find_product.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt("connection reset".into()));
        }
        self.inner.find_product(product_id).await
    }

    async fn find_package_price(&self, id: Uuid) -> StoreResult<Option<PackagePrice>> {
        self.inner.find_package_price(id).await
    }

    async fn find_package_by_provider_id(
        &self,
        provider_price_id: i64,
    ) -> StoreResult<Option<PackagePrice>> {
        self.inner.find_package_by_provider_id(provider_price_id).await
    }

    async fn list_package_prices(&self, sku_id: &str) -> StoreResult<Vec<PackagePrice>> {
        self.inner.list_package_prices(sku_id).await
    }

    async fn save_package_price(&self, price: &PackagePrice) -> StoreResult<()> {
        self.inner.save_package_price(price).await
    }

    async fn deactivate_missing(&self, sku_id: &str, keep: &[i64], now: i64) -> StoreResult<u64> {
        self.inner.deactivate_missing(sku_id, keep, now).await
    }
}

// ========== Rate feed ==========

pub struct StaticFeed(pub Option<Decimal>);

#[async_trait]
impl RateFeed for StaticFeed {
    async fn fetch(&self, _from: &str, to: &str) -> Result<Decimal, RateFetchError> {
        self.0.ok_or_else(|| RateFetchError::Missing(to.to_string()))
    }
}

// ========== Fixture ==========

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<MockGateway>,
    pub partner: Arc<MockPartner>,
    pub product: Product,
    pub package: PackagePrice,
    pub service: OrderService,
}

pub fn product() -> Product {
    Product {
        id: Uuid::new_v4(),
        sku_id: SKU.into(),
        name: "Japan".into(),
        description: "Japan eSIM".into(),
        data_limit: "3GB".into(),
        validity_days: 7,
        countries: vec!["JP".into()],
        is_active: true,
        created_at: 0,
        updated_at: 0,
    }
}

pub fn package(sku: &str, provider_price_id: i64, raw: Decimal) -> PackagePrice {
    PackagePrice {
        id: Uuid::new_v4(),
        sku_id: sku.into(),
        provider_price_id,
        api_code: "JP-3GB-7D".into(),
        show_name: "3GB 7 Days".into(),
        flows: dec!(3),
        unit: "GB".into(),
        days: 7,
        raw_price_usd: raw,
        markup_percent: None,
        override_price_usd: None,
        effective_price_usd: raw,
        effective_price_local: None,
        exchange_rate: None,
        price_source: PriceSource::Base,
        active: true,
        last_synced_at: None,
        created_at: 0,
        updated_at: 0,
    }
}

pub fn config() -> Config {
    Config {
        database_url: String::new(),
        http_port: 0,
        environment: "development".into(),
        jwt_secret: JWT_SECRET.into(),
        http_timeout: Duration::from_secs(5),
        qpay: QPayConfig {
            endpoint: "http://qpay.invalid".into(),
            merchant_id: "MERCHANT".into(),
            password: PASSWORD.into(),
            invoice_code: "ESIM_INVOICE".into(),
            callback_url: "http://localhost/api/webhooks/qpay".into(),
            require_signature: false,
        },
        roamwifi: RoamWifiConfig {
            api_url: "http://roamwifi.invalid".into(),
            phonenumber: "99112233".into(),
            password: "pw".into(),
            sign_key: "ro@mw1f1-bpm-ap1".into(),
            api_key: None,
        },
        pricing: PricingConfig {
            rate_api_url: "http://rates.invalid".into(),
            local_currency: "MNT".into(),
            fallback_rate: dec!(2850),
            strict_rate: false,
        },
    }
}

pub async fn seed_rate(store: &MemoryStore, rate: Decimal) {
    store
        .append_rate(&CurrencyRate {
            id: Uuid::new_v4(),
            from_currency: "USD".into(),
            to_currency: "MNT".into(),
            rate,
            source: RateSource::Manual,
            created_at: chrono::Utc::now().timestamp_millis(),
        })
        .await
        .unwrap();
}

impl Fixture {
    /// Product + package at 10.00 USD with a 20% markup; rate 3450 stored
    pub async fn new() -> Self {
        Self::with(Some(dec!(3450)), OrderSettings::default()).await
    }

    pub async fn with(rate: Option<Decimal>, settings: OrderSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let product = product();
        store.add_product(product.clone());

        let mut package = package(SKU, PROVIDER_PRICE_ID, dec!(10.00));
        apply_markup(&mut package, dec!(20), rate).unwrap();
        store.save_package_price(&package).await.unwrap();

        if let Some(rate) = rate {
            seed_rate(&store, rate).await;
        }

        let gateway = Arc::new(MockGateway::default());
        let partner = Arc::new(MockPartner::new());
        let rates = RateResolver::new(store.clone(), Arc::new(StaticFeed(None)), dec!(2850));
        let service = OrderService::new(
            store.clone(),
            store.clone(),
            rates,
            gateway.clone(),
            partner.clone(),
            settings,
        );

        Self {
            store,
            gateway,
            partner,
            product,
            package,
            service,
        }
    }

    /// A second service over `store`, sharing this fixture's doubles
    pub fn service_over(&self, store: Arc<FaultyStore>) -> OrderService {
        let rates = RateResolver::new(
            self.store.clone(),
            Arc::new(StaticFeed(None)),
            dec!(2850),
        );
        OrderService::new(
            store.clone(),
            store,
            rates,
            self.gateway.clone(),
            self.partner.clone(),
            OrderSettings::default(),
        )
    }

    pub fn parts(&self) -> Parts {
        Parts {
            order_store: self.store.clone(),
            catalog_store: self.store.clone(),
            rate_store: self.store.clone(),
            rate_feed: Arc::new(StaticFeed(None)),
            gateway: self.gateway.clone(),
            partner: self.partner.clone(),
            notifier: None,
        }
    }
}

pub fn order_request(fx: &Fixture) -> esim_cloud::orders::CreateOrderRequest {
    esim_cloud::orders::CreateOrderRequest {
        product_id: fx.product.id,
        package_price_id: Some(fx.package.id),
        provider_price_id: None,
        customer_email: Some("traveler@example.mn".into()),
        customer_phone: Some("99001122".into()),
        custom_price_usd: None,
    }
}

pub fn payment_event(order_number: &str, invoice_id: &str, status: &str) -> PaymentEvent {
    PaymentEvent::from_value(&webhook_body(order_number, invoice_id, status)).unwrap()
}

pub fn webhook_body(order_number: &str, invoice_id: &str, status: &str) -> serde_json::Value {
    json!({
        "invoice_id": invoice_id,
        "sender_invoice_no": order_number,
        "transaction_id": format!("TX-{order_number}"),
        "payment_status": status,
        "amount": 41400,
        "paid_amount": 41400,
        "payment_date": "2024-05-01 10:00:00"
    })
}

pub fn app_code(err: ServiceError) -> ErrorCode {
    match err {
        ServiceError::App(e) => e.code,
        ServiceError::Db(e) => panic!("unexpected store error: {e}"),
    }
}
