//! Bearer token authentication for admin and customer callers

pub mod admin_auth;

pub use admin_auth::{Identity, create_token, optional_identity_middleware, require_admin_middleware};
