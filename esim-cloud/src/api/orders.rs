//! Storefront order endpoints
//!
//! - POST /api/orders: create an order and its invoice
//! - GET  /api/orders/{order_number}: persisted status + payment artifacts
//! - POST /api/orders/{order_number}/payment: re-check or re-issue the invoice

use axum::Extension;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use shared::error::ApiResponse;

use crate::auth::Identity;
use crate::error::ServiceResult;
use crate::orders::{Caller, CreateOrderRequest, OrderResponse, OrderView, PaymentInitiation};
use crate::state::AppState;

pub async fn create_order(
    State(state): State<AppState>,
    identity: Option<Extension<Identity>>,
    Json(req): Json<CreateOrderRequest>,
) -> ServiceResult<(StatusCode, ApiResponse<OrderResponse>)> {
    let caller = identity
        .map(|Extension(id)| id.caller())
        .unwrap_or_else(Caller::guest);
    let order = state.orders.create_order(req, caller).await?;
    Ok((StatusCode::CREATED, ApiResponse::success(order)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> ServiceResult<ApiResponse<OrderView>> {
    let view = state.orders.get_order(&order_number).await?;
    Ok(ApiResponse::success(view))
}

pub async fn initiate_payment(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> ServiceResult<ApiResponse<PaymentInitiation>> {
    let result = state.orders.initiate_payment(&order_number).await?;
    Ok(ApiResponse::success(result))
}
