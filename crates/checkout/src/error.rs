//! Checkout error types.

use common::{BookId, OrderId, UserId};
use domain::{DomainError, ErrorKind};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while placing, cancelling or preparing orders.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart exists but has no line items.
    #[error("Cart is empty")]
    EmptyCart,

    /// The user has never created a cart.
    #[error("No cart found for user {0}")]
    CartNotFound(UserId),

    /// A line asks for more copies than are on the shelf.
    #[error("Insufficient stock for book {book_id}: requested {requested}, available {available}")]
    InsufficientStock {
        book_id: BookId,
        requested: u32,
        available: u32,
    },

    /// A referenced book does not exist.
    #[error("Book not found: {0}")]
    BookNotFound(BookId),

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Catalog pages start at 1.
    #[error("Invalid page: {0} (must be at least 1)")]
    InvalidPage(u32),

    /// Catalog page size out of range.
    #[error("Invalid limit: {limit} (must be between 1 and {max})")]
    InvalidLimit { limit: u32, max: u32 },

    /// Validation, transition or access error from the domain.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The store failed or refused the transaction.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CheckoutError {
    /// Classifies the error for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::InvalidPage(_) | CheckoutError::InvalidLimit { .. } => {
                ErrorKind::Validation
            }
            CheckoutError::CartNotFound(_)
            | CheckoutError::BookNotFound(_)
            | CheckoutError::OrderNotFound(_) => ErrorKind::NotFound,
            CheckoutError::EmptyCart | CheckoutError::InsufficientStock { .. } => {
                ErrorKind::Conflict
            }
            CheckoutError::Domain(e) => e.kind(),
            CheckoutError::Store(e) => e.kind(),
        }
    }

    /// Returns true if running the same request again may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Short label used for the `reason` metric dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            CheckoutError::EmptyCart => "empty_cart",
            CheckoutError::CartNotFound(_) => "cart_not_found",
            CheckoutError::InsufficientStock { .. } => "insufficient_stock",
            CheckoutError::BookNotFound(_) => "book_not_found",
            CheckoutError::OrderNotFound(_) => "order_not_found",
            CheckoutError::InvalidPage(_) | CheckoutError::InvalidLimit { .. } => "invalid_paging",
            CheckoutError::Domain(_) => "domain",
            CheckoutError::Store(_) => "storage",
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
