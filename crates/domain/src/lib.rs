//! Domain layer for the bookstore backend.
//!
//! This crate provides the core domain model including:
//! - Books with guarded stock counters
//! - Carts and their line items
//! - Orders with price snapshots and a status machine
//! - Reviews, ratings and the rating mean
//! - The error taxonomy and the access predicate

pub mod authz;
pub mod book;
pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod review;

pub use authz::{Identity, Operation, Resource, Role, authorize, is_permitted};
pub use book::{Book, BookUpdate, NewBook};
pub use cart::{Cart, CartItem, validate_quantity};
pub use error::{DomainError, ErrorKind};
pub use money::Money;
pub use order::{Order, OrderLine, OrderStatus};
pub use review::{Rating, Review, mean_rating};
