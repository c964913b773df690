use domain::ErrorKind;
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A concurrent writer got there first (serialization failure, deadlock,
    /// duplicate key on a racing insert). Safe to retry.
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// The store could not be reached or the pool is exhausted. Safe to retry.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Any other database error.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A persisted row could not be turned back into a domain value.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl StoreError {
    /// Classifies the error for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Conflict(_) | StoreError::Unavailable(_) => ErrorKind::TransientStorage,
            StoreError::Database(_) | StoreError::Migration(_) | StoreError::Decode(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Returns true if re-running the whole unit of work may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// SQLSTATE codes that mean "another writer won, try again".
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED | UNIQUE_VIOLATION) => {
                    StoreError::Conflict(db_err.message().to_string())
                }
                _ => StoreError::Database(err),
            },
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
            _ => StoreError::Database(err),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
