//! Transactional storage for the bookstore.
//!
//! The [`Store`] trait is implemented by an in-memory backend for tests and
//! local runs and by a PostgreSQL backend for production.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{FaultPoint, InMemoryStore, InMemoryTransaction};
pub use postgres::{PostgresStore, PostgresTransaction};
pub use query::{
    BookQuery, DEFAULT_BOOK_PAGE_SIZE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page, ReviewQuery,
    ReviewSort,
};
pub use store::{Store, StoreTransaction, finish};
