//! API routes for esim-cloud

pub mod admin;
pub mod health;
pub mod orders;
pub mod qpay_webhook;

use axum::routing::{get, post, put};
use axum::{Router, middleware};
use http::{HeaderName, HeaderValue};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::{optional_identity_middleware, require_admin_middleware};
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Storefront orders (guest or bearer)
    let orders = Router::new()
        .route("/api/orders", post(orders::create_order))
        .route("/api/orders/{order_number}", get(orders::get_order))
        .route(
            "/api/orders/{order_number}/payment",
            post(orders::initiate_payment),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            optional_identity_middleware,
        ));

    // QPay callback (raw body, optional signature header)
    let webhook = Router::new().route("/api/webhooks/qpay", post(qpay_webhook::handle_webhook));

    let admin = Router::new()
        .route("/api/admin/orders", get(admin::list_orders))
        .route("/api/admin/packages/{price_id}/markup", put(admin::set_markup))
        .route(
            "/api/admin/packages/{price_id}/override",
            put(admin::set_override),
        )
        .route("/api/admin/skus", get(admin::list_skus))
        .route("/api/admin/skus/{sku_id}/packages", get(admin::sku_packages))
        .route("/api/admin/skus/{sku_id}/prices", get(admin::package_prices))
        .route("/api/admin/skus/{sku_id}/sync", post(admin::sync_sku))
        .route("/api/admin/rates", post(admin::set_rate))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(orders)
        .merge(webhook)
        .merge(admin)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .with_state(state)
}
