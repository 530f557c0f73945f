//! Error codes shared by the service and its API clients
//!
//! Codes are grouped by range:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Payment and webhook errors
//! - 6xxx: Catalog and pricing errors
//! - 7xxx: Provisioning errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Serialized as a bare `u16` so clients can switch on the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Required field missing
    RequiredField = 7,

    // ==================== 1xxx: Auth ====================
    /// Caller is not authenticated
    NotAuthenticated = 1001,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Admin role required
    AdminRequired = 2003,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has already been paid
    OrderAlreadyPaid = 4002,
    /// Order has already been completed
    OrderAlreadyCompleted = 4003,
    /// Order is no longer awaiting payment
    OrderNotPending = 4004,
    /// Order has failed
    OrderFailed = 4005,
    /// No free order number could be generated
    OrderNumberExhausted = 4006,

    // ==================== 5xxx: Payment ====================
    /// Invoice could not be created
    InvoiceCreationFailed = 5003,
    /// Webhook signature does not match
    WebhookSignatureInvalid = 5004,
    /// Webhook payload could not be parsed
    WebhookPayloadInvalid = 5005,

    // ==================== 6xxx: Catalog ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Package price not found
    PackageNotFound = 6101,
    /// Package belongs to a different SKU than the product
    PackageSkuMismatch = 6102,
    /// No package was selected
    PackageSelectionRequired = 6103,
    /// Package is no longer offered
    PackageInactive = 6104,
    /// Price is invalid
    InvalidPrice = 6201,
    /// Markup percentage out of range
    MarkupOutOfRange = 6202,
    /// No fresh exchange rate is available
    RateUnavailable = 6301,

    // ==================== 7xxx: Provisioning ====================
    /// Partner rejected our credentials
    PartnerAuthFailed = 7002,
    /// Partner rejected the request
    PartnerRejected = 7003,
    /// Partner response could not be understood
    PartnerResponseInvalid = 7004,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Operation timed out
    TimeoutError = 9004,
    /// Upstream service unavailable
    UpstreamUnavailable = 9006,
}

impl ErrorCode {
    /// Numeric value of this code
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Default human-readable message
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Success => "Operation completed successfully",
            Self::RequiredField => "Required field missing",

            Self::NotAuthenticated => "Not authenticated",
            Self::TokenInvalid => "Token is invalid",

            Self::PermissionDenied => "Permission denied",
            Self::AdminRequired => "Admin role required",

            Self::OrderNotFound => "Order not found",
            Self::OrderAlreadyPaid => "Order has already been paid",
            Self::OrderAlreadyCompleted => "Order has already been completed",
            Self::OrderNotPending => "Order is not pending payment",
            Self::OrderFailed => "Order has failed",
            Self::OrderNumberExhausted => "Could not allocate an order number",

            Self::InvoiceCreationFailed => "Invoice creation failed",
            Self::WebhookSignatureInvalid => "Invalid webhook signature",
            Self::WebhookPayloadInvalid => "Invalid webhook payload",

            Self::ProductNotFound => "Product not found",
            Self::PackageNotFound => "Package not found",
            Self::PackageSkuMismatch => "Package does not belong to this product",
            Self::PackageSelectionRequired => "Package selection required",
            Self::PackageInactive => "Package is no longer available",
            Self::InvalidPrice => "Invalid price",
            Self::MarkupOutOfRange => "Markup must be between 0 and 500 percent",
            Self::RateUnavailable => "Exchange rate unavailable",

            Self::PartnerAuthFailed => "Partner authentication failed",
            Self::PartnerRejected => "Partner rejected the request",
            Self::PartnerResponseInvalid => "Invalid partner response",

            Self::InternalError => "Internal server error",
            Self::TimeoutError => "Operation timed out",
            Self::UpstreamUnavailable => "Upstream service unavailable",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

/// A `u16` that does not name any [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Success,
            7 => Self::RequiredField,

            1001 => Self::NotAuthenticated,
            1004 => Self::TokenInvalid,

            2001 => Self::PermissionDenied,
            2003 => Self::AdminRequired,

            4001 => Self::OrderNotFound,
            4002 => Self::OrderAlreadyPaid,
            4003 => Self::OrderAlreadyCompleted,
            4004 => Self::OrderNotPending,
            4005 => Self::OrderFailed,
            4006 => Self::OrderNumberExhausted,

            5003 => Self::InvoiceCreationFailed,
            5004 => Self::WebhookSignatureInvalid,
            5005 => Self::WebhookPayloadInvalid,

            6001 => Self::ProductNotFound,
            6101 => Self::PackageNotFound,
            6102 => Self::PackageSkuMismatch,
            6103 => Self::PackageSelectionRequired,
            6104 => Self::PackageInactive,
            6201 => Self::InvalidPrice,
            6202 => Self::MarkupOutOfRange,
            6301 => Self::RateUnavailable,

            7002 => Self::PartnerAuthFailed,
            7003 => Self::PartnerRejected,
            7004 => Self::PartnerResponseInvalid,

            9001 => Self::InternalError,
            9004 => Self::TimeoutError,
            9006 => Self::UpstreamUnavailable,

            other => return Err(InvalidErrorCode(other)),
        })
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
