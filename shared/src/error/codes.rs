//! Unified error codes for the fulfillment backend
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Order errors
//! - 4xxx: Payment errors
//! - 5xxx: Rider errors
//! - 6xxx: Shift errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for compact serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,
    /// Concurrent modification or state conflict
    Conflict = 9,
    /// Requested state is not reachable from the current one
    InvalidTransition = 10,

    // ==================== 1xxx: Auth ====================
    /// No principal attached to the request
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Account is disabled
    AccountDisabled = 1007,

    // ==================== 2xxx: Permission ====================
    /// Principal lacks the required capability
    PermissionDenied = 2001,

    // ==================== 3xxx: Order ====================
    /// Order not found
    OrderNotFound = 3001,
    /// Order has no items
    OrderEmpty = 3002,
    /// Submitted total disagrees with the computed total
    OrderTotalMismatch = 3003,
    /// Delivery order without a delivery address
    DeliveryAddressRequired = 3004,
    /// Order number generation kept colliding
    OrderNumberExhausted = 3005,
    /// Order was modified by another request
    OrderVersionConflict = 3006,
    /// Order is in flight or completed and cannot be deleted
    OrderNotDeletable = 3007,

    // ==================== 4xxx: Payment ====================
    /// Invalid monetary amount
    PaymentInvalidAmount = 4001,

    // ==================== 5xxx: Rider ====================
    /// Rider profile not found
    RiderNotFound = 5001,
    /// No online rider qualifies for the delivery
    NoRiderAvailable = 5002,
    /// Order already has a rider
    RiderAlreadyAssigned = 5003,
    /// Rider is not online
    RiderNotAvailable = 5004,
    /// Coordinates are not well-formed
    InvalidCoordinates = 5005,
    /// Order has no delivery coordinates
    DeliveryCoordinatesMissing = 5006,

    // ==================== 6xxx: Shift ====================
    /// Shift not found
    ShiftNotFound = 6001,
    /// User already has an open shift
    ShiftAlreadyOpen = 6002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            Self::Success => "Operation completed successfully",
            Self::Unknown => "An unknown error occurred",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::RequiredField => "Required field is missing",
            Self::ValueOutOfRange => "Value is out of range",
            Self::Conflict => "Resource state conflict",
            Self::InvalidTransition => "Invalid state transition",

            // Auth
            Self::NotAuthenticated => "Authentication required",
            Self::TokenExpired => "Token has expired",
            Self::TokenInvalid => "Invalid token",
            Self::AccountDisabled => "Account is disabled",

            // Permission
            Self::PermissionDenied => "Permission denied",

            // Order
            Self::OrderNotFound => "Order not found",
            Self::OrderEmpty => "Order has no items",
            Self::OrderTotalMismatch => "Order total does not match its components",
            Self::DeliveryAddressRequired => "Delivery orders require a delivery address",
            Self::OrderNumberExhausted => "Could not allocate a unique order number",
            Self::OrderVersionConflict => "Order was modified concurrently",
            Self::OrderNotDeletable => "Order cannot be deleted in its current status",

            // Payment
            Self::PaymentInvalidAmount => "Invalid payment amount",

            // Rider
            Self::RiderNotFound => "Rider not found",
            Self::NoRiderAvailable => "No rider available",
            Self::RiderAlreadyAssigned => "Order already has a rider assigned",
            Self::RiderNotAvailable => "Rider is not available",
            Self::InvalidCoordinates => "Invalid coordinates",
            Self::DeliveryCoordinatesMissing => "Order has no delivery coordinates",

            // Shift
            Self::ShiftNotFound => "Shift not found",
            Self::ShiftAlreadyOpen => "An open shift already exists",

            // System
            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an invalid u16 to ErrorCode
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
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),
            9 => Ok(ErrorCode::Conflict),
            10 => Ok(ErrorCode::InvalidTransition),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1007 => Ok(ErrorCode::AccountDisabled),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),

            // Order
            3001 => Ok(ErrorCode::OrderNotFound),
            3002 => Ok(ErrorCode::OrderEmpty),
            3003 => Ok(ErrorCode::OrderTotalMismatch),
            3004 => Ok(ErrorCode::DeliveryAddressRequired),
            3005 => Ok(ErrorCode::OrderNumberExhausted),
            3006 => Ok(ErrorCode::OrderVersionConflict),
            3007 => Ok(ErrorCode::OrderNotDeletable),

            // Payment
            4001 => Ok(ErrorCode::PaymentInvalidAmount),

            // Rider
            5001 => Ok(ErrorCode::RiderNotFound),
            5002 => Ok(ErrorCode::NoRiderAvailable),
            5003 => Ok(ErrorCode::RiderAlreadyAssigned),
            5004 => Ok(ErrorCode::RiderNotAvailable),
            5005 => Ok(ErrorCode::InvalidCoordinates),
            5006 => Ok(ErrorCode::DeliveryCoordinatesMissing),

            // Shift
            6001 => Ok(ErrorCode::ShiftNotFound),
            6002 => Ok(ErrorCode::ShiftAlreadyOpen),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
