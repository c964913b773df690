use async_trait::async_trait;
use common::{BookId, CartId, OrderId, UserId};
use domain::{Book, Cart, Order, Rating, Review};

use crate::{BookQuery, Page, Result, ReviewQuery, StoreError};

/// An open atomic scope over books, carts, orders and reviews.
///
/// Every write made through a transaction becomes visible to other readers
/// only on [`commit`](StoreTransaction::commit). Dropping a transaction
/// without committing discards all of its writes.
///
/// Row locks are always taken cart first, then books. Nothing that holds a
/// book lock goes on to lock a cart.
#[async_trait]
pub trait StoreTransaction: Send + Sized {
    /// Loads a user's cart and locks it against concurrent edits.
    async fn get_cart(&mut self, user_id: UserId) -> Result<Option<Cart>>;

    /// Writes a cart and its full item list, creating it if needed.
    async fn save_cart(&mut self, cart: &Cart) -> Result<()>;

    /// Empties a cart's items. The cart record itself is kept.
    async fn clear_cart(&mut self, cart_id: CartId) -> Result<()>;

    /// Loads the given books and locks them for the rest of the transaction.
    ///
    /// Books are locked in ascending id order so that two transactions over
    /// overlapping sets cannot deadlock. Missing ids are simply absent from
    /// the result.
    async fn lock_books(&mut self, book_ids: &[BookId]) -> Result<Vec<Book>>;

    /// Reads a book without locking it.
    async fn get_book(&mut self, book_id: BookId) -> Result<Option<Book>>;

    /// Removes `quantity` from a book's stock if at least that much is left.
    ///
    /// Returns `false` and changes nothing when stock is insufficient or the
    /// book does not exist.
    async fn decrement_if_available(&mut self, book_id: BookId, quantity: u32) -> Result<bool>;

    /// Adds `quantity` back to a book's stock.
    async fn restock(&mut self, book_id: BookId, quantity: u32) -> Result<()>;

    /// Inserts a new order with its line items.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Loads an order and locks it against concurrent status changes.
    async fn get_order_for_update(&mut self, order_id: OrderId) -> Result<Option<Order>>;

    /// Persists an order's status and `updated_at`.
    async fn update_order_status(&mut self, order: &Order) -> Result<()>;

    /// Returns true if the user has already reviewed the book.
    async fn has_review(&mut self, user_id: UserId, book_id: BookId) -> Result<bool>;

    /// Inserts a new review.
    async fn insert_review(&mut self, review: &Review) -> Result<()>;

    /// Returns every rating recorded for a book, including uncommitted ones
    /// written by this transaction.
    async fn ratings_for_book(&mut self, book_id: BookId) -> Result<Vec<Rating>>;

    /// Overwrites a book's derived average rating.
    async fn set_average_rating(&mut self, book_id: BookId, average: f64) -> Result<()>;

    /// Makes every write visible at once.
    async fn commit(self) -> Result<()>;

    /// Discards every write.
    async fn rollback(self) -> Result<()>;
}

/// Storage for the bookstore.
///
/// All implementations must be thread-safe (Send + Sync). Multi-entity
/// writes go through [`Store::begin`]; the remaining methods are single
/// statement reads and writes.
#[async_trait]
pub trait Store: Send + Sync {
    /// The transaction type handed out by [`Store::begin`].
    type Transaction: StoreTransaction;

    /// Opens an atomic scope.
    async fn begin(&self) -> Result<Self::Transaction>;

    /// Inserts a new book.
    async fn insert_book(&self, book: &Book) -> Result<()>;

    /// Retrieves a book by id.
    async fn get_book(&self, book_id: BookId) -> Result<Option<Book>>;

    /// Writes a book's descriptive fields and price.
    ///
    /// Stock and average rating are never written by this call.
    async fn update_book_details(&self, book: &Book) -> Result<()>;

    /// Retrieves one page of the catalog, ordered by title.
    async fn list_books(&self, query: &BookQuery) -> Result<Page<Book>>;

    /// Retrieves a user's cart without locking it.
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>>;

    /// Retrieves an order by id.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Lists a user's orders, oldest first.
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Returns true if the user has a non-cancelled order containing the book.
    async fn has_eligible_order(&self, user_id: UserId, book_id: BookId) -> Result<bool>;

    /// Retrieves one page of a book's reviews.
    async fn list_reviews(&self, query: &ReviewQuery) -> Result<Page<Review>>;
}

/// Commits `tx` when `result` is Ok and rolls it back otherwise.
///
/// A failed commit replaces the value with the store error. A failed
/// rollback is logged and the original error is returned.
pub async fn finish<T, V, E>(tx: T, result: std::result::Result<V, E>) -> std::result::Result<V, E>
where
    T: StoreTransaction,
    E: From<StoreError> + std::fmt::Display,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            tracing::debug!(error = %err, "rolling back transaction");
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, "transaction rollback failed");
            }
            Err(err)
        }
    }
}
