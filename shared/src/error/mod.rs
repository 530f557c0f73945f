//! Unified error system for the eSIM platform
//!
//! - [`ErrorCode`]: stable numeric codes returned to API clients
//! - [`ErrorCategory`]: classification of codes by range
//! - [`AppError`]: error carrying a code, a message and optional details
//! - [`ApiResponse`]: the JSON envelope every endpoint answers with
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Payment and webhook errors
//! - 6xxx: Catalog and pricing errors
//! - 7xxx: Provisioning errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{ApiResponse, AppError, ErrorCode};
//!
//! let err = AppError::with_message(ErrorCode::PackageSkuMismatch, "package belongs to another SKU")
//!     .with_detail("sku_id", "114");
//! let response = ApiResponse::<()>::error(&err);
//! assert_eq!(response.code, Some(6102));
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
