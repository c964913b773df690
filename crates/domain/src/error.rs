//! Domain error types and the error taxonomy shared by every service.

use thiserror::Error;

use crate::authz::Operation;
use crate::order::OrderStatus;

/// Stable classification of a failure, independent of which layer raised it.
///
/// Every error surfaced to a caller maps onto exactly one kind; the HTTP
/// layer derives status codes from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input: non-positive quantity, out-of-range rating, bad paging.
    Validation,
    /// A referenced entity does not exist.
    NotFound,
    /// The request conflicts with current state (empty cart, stock, status).
    Conflict,
    /// The caller is not allowed to perform the operation.
    Authorization,
    /// The store was unavailable or a write conflicted; safe to retry.
    TransientStorage,
    /// A storage fault that retrying will not fix.
    Internal,
}

impl ErrorKind {
    /// Returns the kind as a stable snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Authorization => "authorization_error",
            ErrorKind::TransientStorage => "transient_storage_error",
            ErrorKind::Internal => "internal_error",
        }
    }

    /// Returns true if the caller may safely re-issue the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::TransientStorage)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors raised by domain rules, before anything touches storage.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Quantity must be a positive integer.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: i64 },

    /// Rating must be an integer between 1 and 5.
    #[error("Invalid rating: {rating} (must be between 1 and 5)")]
    InvalidRating { rating: i64 },

    /// Prices are never negative.
    #[error("Invalid price: {cents} cents (must not be negative)")]
    NegativePrice { cents: i64 },

    /// A required text field was blank.
    #[error("Field '{0}' must not be empty")]
    MissingField(&'static str),

    /// A line or order total does not fit in the money representation.
    #[error("Amount overflow: order total is too large")]
    AmountOverflow,

    /// An order cannot have zero line items.
    #[error("Order has no items")]
    NoItems,

    /// The order status machine does not allow this move.
    #[error("Invalid status transition: cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Unrecognized order status string.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    /// Unrecognized role string.
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// The access predicate rejected the call.
    #[error("Access denied for {operation}")]
    AccessDenied { operation: Operation },
}

impl DomainError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::InvalidTransition { .. } => ErrorKind::Conflict,
            DomainError::AccessDenied { .. } => ErrorKind::Authorization,
            DomainError::InvalidQuantity { .. }
            | DomainError::InvalidRating { .. }
            | DomainError::NegativePrice { .. }
            | DomainError::MissingField(_)
            | DomainError::NoItems
            | DomainError::AmountOverflow
            | DomainError::UnknownStatus(_)
            | DomainError::UnknownRole(_) => ErrorKind::Validation,
        }
    }
}
