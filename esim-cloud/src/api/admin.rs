//! Admin endpoints (bearer token with the admin role)

use axum::Json;
use axum::extract::{Path, Query, State};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::error::ApiResponse;
use shared::models::{CurrencyRate, Order, PackagePrice};
use uuid::Uuid;

use crate::catalog::SyncReport;
use crate::error::ServiceResult;
use crate::roamwifi::{Sku, SkuPackages};
use crate::state::AppState;
use crate::store::OrderFilter;

#[derive(Debug, Deserialize)]
pub struct MarkupRequest {
    pub markup_percent: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    /// `null` clears the override
    pub override_price_usd: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rate: Decimal,
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> ServiceResult<ApiResponse<Vec<Order>>> {
    Ok(ApiResponse::success(state.orders.list_orders(&filter).await?))
}

pub async fn set_markup(
    State(state): State<AppState>,
    Path(price_id): Path<Uuid>,
    Json(req): Json<MarkupRequest>,
) -> ServiceResult<ApiResponse<PackagePrice>> {
    let price = state.catalog.set_markup(price_id, req.markup_percent).await?;
    Ok(ApiResponse::success(price))
}

pub async fn set_override(
    State(state): State<AppState>,
    Path(price_id): Path<Uuid>,
    Json(req): Json<OverrideRequest>,
) -> ServiceResult<ApiResponse<PackagePrice>> {
    let price = state
        .catalog
        .set_override(price_id, req.override_price_usd)
        .await?;
    Ok(ApiResponse::success(price))
}

pub async fn list_skus(State(state): State<AppState>) -> ServiceResult<ApiResponse<Vec<Sku>>> {
    Ok(ApiResponse::success(state.catalog.list_skus().await?))
}

pub async fn sku_packages(
    State(state): State<AppState>,
    Path(sku_id): Path<String>,
) -> ServiceResult<ApiResponse<SkuPackages>> {
    Ok(ApiResponse::success(
        state.catalog.partner_packages(&sku_id).await?,
    ))
}

pub async fn package_prices(
    State(state): State<AppState>,
    Path(sku_id): Path<String>,
) -> ServiceResult<ApiResponse<Vec<PackagePrice>>> {
    Ok(ApiResponse::success(
        state.catalog.list_package_prices(&sku_id).await?,
    ))
}

pub async fn sync_sku(
    State(state): State<AppState>,
    Path(sku_id): Path<String>,
) -> ServiceResult<ApiResponse<SyncReport>> {
    Ok(ApiResponse::success(
        state.catalog.sync_package_prices(&sku_id).await?,
    ))
}

pub async fn set_rate(
    State(state): State<AppState>,
    Json(req): Json<RateRequest>,
) -> ServiceResult<ApiResponse<CurrencyRate>> {
    Ok(ApiResponse::success(
        state.catalog.set_manual_rate(req.rate).await?,
    ))
}
