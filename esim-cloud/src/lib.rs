//! esim-cloud: eSIM order, payment and provisioning service
//!
//! A customer picks a package, pays a QPay invoice, and RoamWiFi issues
//! the eSIM once the payment webhook confirms the payment.
//!
//! # Modules
//!
//! ```text
//! esim-cloud/src/
//! ├── config.rs    # environment configuration
//! ├── state.rs     # shared application state
//! ├── store/       # persistence traits + in-memory store
//! ├── db/          # PostgreSQL store (sqlx)
//! ├── pricing/     # effective price resolution + exchange rates
//! ├── qpay/        # invoice gateway adapter + webhook ingress
//! ├── roamwifi/    # provisioning partner adapter
//! ├── orders/      # order orchestrator (state machine)
//! ├── catalog.rs   # package price sync + admin pricing overlay
//! ├── auth/        # bearer token validation
//! └── api/         # HTTP routes
//! ```

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod loose;
pub mod orders;
pub mod pricing;
pub mod qpay;
pub mod roamwifi;
pub mod state;
pub mod store;
pub mod util;

pub use config::Config;
pub use state::AppState;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
