//! Shared types for the eSIM platform
//!
//! Error system, API response envelope and the domain records that the
//! service, its persistence layer and API clients exchange.

pub mod error;
pub mod models;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
