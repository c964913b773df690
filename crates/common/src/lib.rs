//! Identifier types shared by every crate in the bookstore backend.

mod types;

pub use types::{BookId, CartId, OrderId, ReviewId, UserId};
