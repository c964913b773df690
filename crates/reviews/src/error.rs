//! Review error types.

use common::{BookId, UserId};
use domain::{DomainError, ErrorKind};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while submitting or listing reviews.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// The user has no non-cancelled order containing the book.
    #[error("User {user_id} has not purchased book {book_id}")]
    NotPurchased { user_id: UserId, book_id: BookId },

    /// The book does not exist.
    #[error("Book not found: {0}")]
    BookNotFound(BookId),

    /// The user already reviewed the book and duplicates are rejected.
    #[error("User {user_id} has already reviewed book {book_id}")]
    DuplicateReview { user_id: UserId, book_id: BookId },

    /// Page numbers start at 1.
    #[error("Invalid page {0}: must be at least 1")]
    InvalidPage(i64),

    /// Page size out of range.
    #[error("Invalid limit {limit}: must be between 1 and {max}")]
    InvalidLimit { limit: i64, max: u32 },

    /// Validation error from the domain, such as a rating outside 1..=5.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReviewError {
    /// Classifies the error for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReviewError::NotPurchased { .. } => ErrorKind::Authorization,
            ReviewError::BookNotFound(_) => ErrorKind::NotFound,
            ReviewError::DuplicateReview { .. } => ErrorKind::Conflict,
            ReviewError::InvalidPage(_) | ReviewError::InvalidLimit { .. } => {
                ErrorKind::Validation
            }
            ReviewError::Domain(e) => e.kind(),
            ReviewError::Store(e) => e.kind(),
        }
    }

    /// Returns true if running the same request again may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Convenience type alias for review results.
pub type Result<T> = std::result::Result<T, ReviewError>;
