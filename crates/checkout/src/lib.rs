//! Order placement and the writes that surround it.
//!
//! The checkout coordinator turns a user's cart into an order in a single
//! store transaction:
//! 1. Lock the cart and its books
//! 2. Check every line against current stock
//! 3. Decrement stock and snapshot prices
//! 4. Insert the order and empty the cart
//!
//! Any failure rolls the whole transaction back, so stock, order and cart
//! change together or not at all.

pub mod cart;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod inventory;

pub use cart::CartService;
pub use catalog::CatalogService;
pub use config::CheckoutConfig;
pub use coordinator::CheckoutCoordinator;
pub use error::{CheckoutError, Result};
