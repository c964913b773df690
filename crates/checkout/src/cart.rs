//! Cart editing ahead of checkout.

use common::{BookId, UserId};
use domain::{Cart, validate_quantity};
use store::{Store, StoreTransaction, finish};

use crate::error::{CheckoutError, Result};

/// Reads and edits a user's cart.
///
/// Edits run in a store transaction that locks the cart, so they serialize
/// with a checkout of the same cart.
#[derive(Clone)]
pub struct CartService<S: Store> {
    store: S,
}

impl<S: Store> CartService<S> {
    /// Creates a new cart service.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the user's cart, or an unsaved empty one if they have none.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<Cart> {
        Ok(self
            .store
            .get_cart(user_id)
            .await?
            .unwrap_or_else(|| Cart::new(user_id)))
    }

    /// Adds copies of a book, creating the cart on first use.
    ///
    /// The quantity must be positive, the book must exist and its current
    /// stock must cover the requested quantity. Stock is not reserved here.
    #[tracing::instrument(skip(self))]
    pub async fn add_to_cart(&self, user_id: UserId, book_id: BookId, quantity: i64) -> Result<Cart> {
        let quantity = validate_quantity(quantity)?;

        let mut tx = self.store.begin().await?;
        let result = Self::add_in(&mut tx, user_id, book_id, quantity).await;
        let cart = finish(tx, result).await?;

        tracing::info!(cart_id = %cart.id, items = cart.items.len(), "cart updated");
        Ok(cart)
    }

    async fn add_in(
        tx: &mut S::Transaction,
        user_id: UserId,
        book_id: BookId,
        quantity: u32,
    ) -> Result<Cart> {
        let mut cart = tx
            .get_cart(user_id)
            .await?
            .unwrap_or_else(|| Cart::new(user_id));

        // Unlocked read; checkout re-checks stock under lock.
        let book = tx
            .get_book(book_id)
            .await?
            .ok_or(CheckoutError::BookNotFound(book_id))?;

        if !book.has_stock(quantity) {
            return Err(CheckoutError::InsufficientStock {
                book_id,
                requested: quantity,
                available: book.stock,
            });
        }

        cart.add(book_id, quantity)?;
        tx.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Removes a book's line from the cart.
    ///
    /// Removing a book that is not in the cart leaves it unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn remove_from_cart(&self, user_id: UserId, book_id: BookId) -> Result<Cart> {
        let mut tx = self.store.begin().await?;
        let result = Self::remove_in(&mut tx, user_id, book_id).await;
        finish(tx, result).await
    }

    async fn remove_in(tx: &mut S::Transaction, user_id: UserId, book_id: BookId) -> Result<Cart> {
        let mut cart = tx
            .get_cart(user_id)
            .await?
            .ok_or(CheckoutError::CartNotFound(user_id))?;

        if cart.remove(book_id) {
            tx.save_cart(&cart).await?;
        }
        Ok(cart)
    }
}
