//! Package catalog administration
//!
//! Syncs partner packages into `PackagePrice` rows and applies the admin
//! pricing overlay. Every write recomputes the effective price first.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{CurrencyRate, PackagePrice, PriceSource};
use uuid::Uuid;

use crate::error::ServiceResult;
use crate::pricing::{PricingError, RateResolver, apply_markup, apply_override, recompute};
use crate::roamwifi::{PartnerPackage, ProvisioningPartner, Sku, SkuPackages};
use crate::store::CatalogStore;
use crate::util::now_millis;

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub sku_id: String,
    pub synced: usize,
    pub deactivated: u64,
    pub exchange_rate: Decimal,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    partner: Arc<dyn ProvisioningPartner>,
    rates: RateResolver,
    local_currency: String,
}

impl From<PricingError> for AppError {
    fn from(e: PricingError) -> Self {
        let code = match e {
            PricingError::MarkupOutOfRange(_) => ErrorCode::MarkupOutOfRange,
            PricingError::NonPositiveOverride(_) => ErrorCode::InvalidPrice,
        };
        AppError::with_message(code, e.to_string())
    }
}

/// Fresh row for a package, or the stored one refreshed with partner data.
/// The overlay (markup, override) of a stored row survives.
fn merge_package(
    existing: Option<PackagePrice>,
    sku_id: &str,
    pkg: &PartnerPackage,
    now: i64,
) -> PackagePrice {
    let mut price = existing.unwrap_or_else(|| PackagePrice {
        id: Uuid::new_v4(),
        sku_id: sku_id.to_string(),
        provider_price_id: pkg.provider_price_id,
        api_code: String::new(),
        show_name: String::new(),
        flows: Decimal::ZERO,
        unit: String::new(),
        days: 0,
        raw_price_usd: Decimal::ZERO,
        markup_percent: None,
        override_price_usd: None,
        effective_price_usd: Decimal::ZERO,
        effective_price_local: None,
        exchange_rate: None,
        price_source: PriceSource::Base,
        active: true,
        last_synced_at: None,
        created_at: now,
        updated_at: now,
    });
    price.sku_id = sku_id.to_string();
    price.api_code = pkg.api_code.clone();
    price.show_name = pkg.show_name.clone();
    price.flows = pkg.flows;
    price.unit = pkg.unit.clone();
    price.days = pkg.days;
    price.raw_price_usd = pkg.price_usd;
    price.active = true;
    price.last_synced_at = Some(now);
    price.updated_at = now;
    price
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        partner: Arc<dyn ProvisioningPartner>,
        rates: RateResolver,
        local_currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            partner,
            rates,
            local_currency: local_currency.into(),
        }
    }

    async fn current_rate(&self) -> Decimal {
        self.rates.get_rate("USD", &self.local_currency).await.rate
    }

    pub async fn list_skus(&self) -> ServiceResult<Vec<Sku>> {
        Ok(self.partner.list_skus().await.map_err(AppError::from)?)
    }

    pub async fn partner_packages(&self, sku_id: &str) -> ServiceResult<SkuPackages> {
        Ok(self
            .partner
            .get_packages(sku_id)
            .await
            .map_err(AppError::from)?)
    }

    pub async fn list_package_prices(&self, sku_id: &str) -> ServiceResult<Vec<PackagePrice>> {
        Ok(self.store.list_package_prices(sku_id).await?)
    }

    /// Pull the partner's packages for `sku_id` and reconcile stored rows
    pub async fn sync_package_prices(&self, sku_id: &str) -> ServiceResult<SyncReport> {
        let offered = self
            .partner
            .get_packages(sku_id)
            .await
            .map_err(AppError::from)?;
        let rate = self.current_rate().await;
        let now = now_millis();

        let mut keep = Vec::with_capacity(offered.packages.len());
        for pkg in &offered.packages {
            let existing = self
                .store
                .find_package_by_provider_id(pkg.provider_price_id)
                .await?;
            let mut price = merge_package(existing, sku_id, pkg, now);
            recompute(&mut price, Some(rate));
            self.store.save_package_price(&price).await?;
            keep.push(pkg.provider_price_id);
        }

        let deactivated = self.store.deactivate_missing(sku_id, &keep, now).await?;
        tracing::info!(
            sku_id,
            synced = keep.len(),
            deactivated,
            %rate,
            "Package prices synced"
        );
        Ok(SyncReport {
            sku_id: sku_id.to_string(),
            synced: keep.len(),
            deactivated,
            exchange_rate: rate,
        })
    }

    async fn load(&self, price_id: Uuid) -> ServiceResult<PackagePrice> {
        Ok(self
            .store
            .find_package_price(price_id)
            .await?
            .ok_or_else(|| {
                AppError::new(ErrorCode::PackageNotFound).with_detail("id", price_id.to_string())
            })?)
    }

    pub async fn set_markup(&self, price_id: Uuid, markup: Decimal) -> ServiceResult<PackagePrice> {
        let mut price = self.load(price_id).await?;
        let rate = self.current_rate().await;
        apply_markup(&mut price, markup, Some(rate)).map_err(AppError::from)?;
        price.updated_at = now_millis();
        self.store.save_package_price(&price).await?;
        tracing::info!(%price_id, %markup, effective_usd = %price.effective_price_usd, "Markup set");
        Ok(price)
    }

    /// `None` removes the override
    pub async fn set_override(
        &self,
        price_id: Uuid,
        override_usd: Option<Decimal>,
    ) -> ServiceResult<PackagePrice> {
        let mut price = self.load(price_id).await?;
        let rate = self.current_rate().await;
        apply_override(&mut price, override_usd, Some(rate)).map_err(AppError::from)?;
        price.updated_at = now_millis();
        self.store.save_package_price(&price).await?;
        tracing::info!(%price_id, override_usd = ?override_usd, effective_usd = %price.effective_price_usd, "Override set");
        Ok(price)
    }

    pub async fn set_manual_rate(&self, rate: Decimal) -> ServiceResult<CurrencyRate> {
        if rate <= Decimal::ZERO {
            return Err(AppError::with_message(ErrorCode::InvalidPrice, "rate must be positive").into());
        }
        Ok(self
            .rates
            .set_manual_rate("USD", &self.local_currency, rate)
            .await?)
    }
}
