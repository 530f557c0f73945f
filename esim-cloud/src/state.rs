//! Application state for esim-cloud

use std::sync::Arc;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::BoxError;
use crate::catalog::CatalogService;
use crate::config::Config;
use crate::db::PgStore;
use crate::orders::{OrderService, OrderSettings};
use crate::pricing::{ExchangeRateApi, RateFeed, RateResolver};
use crate::qpay::{InvoiceGateway, QPayClient};
use crate::roamwifi::{DeliveryNotifier, PdfVoucherMailer, ProvisioningPartner, RoamWifiClient};
use crate::store::{CatalogStore, OrderStore, RateStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool (absent when running on an in-memory store)
    pub pool: Option<PgPool>,
    pub orders: OrderService,
    pub catalog: CatalogService,
    /// JWT secret for bearer validation
    pub jwt_secret: String,
    /// QPay merchant password, used to verify webhook signatures
    pub qpay_password: String,
    pub require_webhook_signature: bool,
}

/// Collaborators behind the service traits
pub struct Parts {
    pub order_store: Arc<dyn OrderStore>,
    pub catalog_store: Arc<dyn CatalogStore>,
    pub rate_store: Arc<dyn RateStore>,
    pub rate_feed: Arc<dyn RateFeed>,
    pub gateway: Arc<dyn InvoiceGateway>,
    pub partner: Arc<dyn ProvisioningPartner>,
    pub notifier: Option<Arc<dyn DeliveryNotifier>>,
}

impl AppState {
    /// Connect to PostgreSQL, run migrations and build the outbound clients
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        let store = Arc::new(PgStore::new(pool.clone()));
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        let roamwifi = RoamWifiClient::new(config.roamwifi.clone(), http.clone());

        let parts = Parts {
            order_store: store.clone(),
            catalog_store: store.clone(),
            rate_store: store,
            rate_feed: Arc::new(ExchangeRateApi::new(&config.pricing.rate_api_url)?),
            gateway: Arc::new(QPayClient::new(config.qpay.clone(), http)),
            partner: Arc::new(roamwifi.clone()),
            notifier: Some(Arc::new(PdfVoucherMailer::new(roamwifi))),
        };
        let mut state = Self::from_parts(config, parts);
        state.pool = Some(pool);
        Ok(state)
    }

    /// Wire services from explicit collaborators (tests, alternative stores)
    pub fn from_parts(config: &Config, parts: Parts) -> Self {
        let rates = RateResolver::new(
            parts.rate_store,
            parts.rate_feed,
            config.pricing.fallback_rate,
        );
        let mut orders = OrderService::new(
            parts.order_store,
            parts.catalog_store.clone(),
            rates.clone(),
            parts.gateway,
            parts.partner.clone(),
            OrderSettings {
                local_currency: config.pricing.local_currency.clone(),
                strict_rate: config.pricing.strict_rate,
            },
        );
        if let Some(notifier) = parts.notifier {
            orders = orders.with_notifier(notifier);
        }
        let catalog = CatalogService::new(
            parts.catalog_store,
            parts.partner,
            rates,
            config.pricing.local_currency.clone(),
        );

        Self {
            pool: None,
            orders,
            catalog,
            jwt_secret: config.jwt_secret.clone(),
            qpay_password: config.qpay.password.clone(),
            require_webhook_signature: config.qpay.require_signature,
        }
    }
}
