//! Health check endpoint

use axum::Json;
use axum::extract::State;

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let database = match &state.pool {
        Some(pool) => match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => "ok",
            Err(e) => {
                tracing::warn!(error = %e, "Health check database ping failed");
                "unavailable"
            }
        },
        None => "memory",
    };
    Json(serde_json::json!({
        "status": "ok",
        "service": "esim-cloud",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
    }))
}
