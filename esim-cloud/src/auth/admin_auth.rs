//! JWT authentication
//!
//! Tokens are issued elsewhere (the account service); this side only
//! validates HS256 signatures and reads `sub` and `role`.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::error::AppError;
use uuid::Uuid;

use crate::orders::Caller;
use crate::state::AppState;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    pub iat: usize,
}

/// Authenticated caller extracted from a bearer token
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub role: String,
    pub email: Option<String>,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    pub fn caller(&self) -> Caller {
        Caller {
            user_id: Uuid::parse_str(&self.user_id).ok(),
            is_admin: self.is_admin(),
        }
    }
}

const JWT_EXPIRY_HOURS: i64 = 24;

pub fn create_token(
    user_id: &str,
    role: &str,
    email: Option<&str>,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        email: email.map(String::from),
        exp: (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// `Ok(None)` when no Authorization header is sent
fn identity_from_headers(headers: &HeaderMap, secret: &str) -> Result<Option<Identity>, AppError> {
    let Some(auth_header) = headers.get("Authorization") else {
        return Ok(None);
    };
    let token = auth_header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::invalid_token("Invalid Authorization format"))?;

    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        AppError::invalid_token("Invalid or expired token")
    })?;

    Ok(Some(Identity {
        user_id: token_data.claims.sub,
        role: token_data.claims.role,
        email: token_data.claims.email,
    }))
}

/// Admin routes: a valid token with the admin role is required
pub async fn require_admin_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let identity = identity_from_headers(request.headers(), &state.jwt_secret)
        .map_err(IntoResponse::into_response)?
        .ok_or_else(|| AppError::not_authenticated().into_response())?;
    if !identity.is_admin() {
        tracing::warn!(user_id = %identity.user_id, "Admin route denied");
        return Err(AppError::admin_required().into_response());
    }

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Public routes: guests pass through, a presented token must be valid
pub async fn optional_identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    if let Some(identity) = identity_from_headers(request.headers(), &state.jwt_secret)
        .map_err(IntoResponse::into_response)?
    {
        request.extensions_mut().insert(identity);
    }
    Ok(next.run(request).await)
}
