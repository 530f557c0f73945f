//! QPay payment webhook
//!
//! POST /api/webhooks/qpay with the raw body, so the payload can be parsed
//! and signature-checked before anything touches an order.
//!
//! - malformed payload: 400, nothing mutated (the gateway retries)
//! - signature present but wrong: 401
//! - unknown order number: 404
//! - everything else, redeliveries included: 200

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use shared::error::{AppError, ErrorCode};

use crate::qpay::webhook::SIGNATURE_HEADER;
use crate::qpay::{PaymentEvent, WebhookError, verify_signature};
use crate::state::AppState;

pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let event = match PaymentEvent::from_slice(&body) {
        Ok(ev) => ev,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected QPay webhook payload");
            return AppError::with_message(ErrorCode::WebhookPayloadInvalid, e.to_string())
                .into_response();
        }
    };

    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    if let Err(e) = verify_signature(
        &event,
        signature,
        &state.qpay_password,
        state.require_webhook_signature,
    ) {
        tracing::warn!(
            invoice_id = %event.invoice_id,
            order_number = %event.order_number,
            error = %e,
            "QPay webhook signature check failed"
        );
        let message = match e {
            WebhookError::SignatureMissing => "Missing webhook signature",
            _ => "Invalid webhook signature",
        };
        return AppError::with_message(ErrorCode::WebhookSignatureInvalid, message)
            .into_response();
    }

    match state.orders.handle_payment_event(&event).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "success",
                "message": "Webhook processed successfully",
                "data": outcome,
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
