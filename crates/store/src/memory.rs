use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{BookId, CartId, OrderId, UserId};
use domain::{Book, Cart, Order, Rating, Review};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    BookQuery, Page, Result, ReviewQuery, ReviewSort, StoreError,
    store::{Store, StoreTransaction},
};

/// Points at which a one-shot failure can be injected into [`InMemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// Opening a transaction.
    Begin,
    /// The stock decrement that follows `after` successful decrements.
    StockDecrement { after: usize },
    /// Writing the order record.
    InsertOrder,
    /// Emptying the cart.
    ClearCart,
    /// Committing the transaction.
    Commit,
    /// Writing a review.
    InsertReview,
    /// Storing a recomputed average rating.
    SetAverageRating,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    books: HashMap<BookId, Book>,
    carts: HashMap<UserId, Cart>,
    orders: Vec<Order>,
    reviews: Vec<Review>,
}

/// In-memory store for tests and local runs.
///
/// A transaction holds the store's single lock for its whole lifetime and
/// works on a private copy of the tables, which replaces the shared copy on
/// commit. Writers are therefore fully serialized, and readers never see a
/// half-applied transaction.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    fault: Arc<Mutex<Option<FaultPoint>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a fault that fires the next time `point` is reached.
    pub async fn inject_fault(&self, point: FaultPoint) {
        *self.fault.lock().await = Some(point);
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    /// Returns the total number of reviews stored.
    pub async fn review_count(&self) -> usize {
        self.tables.lock().await.reviews.len()
    }
}

async fn trip(fault: &Mutex<Option<FaultPoint>>, point: FaultPoint) -> Result<()> {
    let mut armed = fault.lock().await;
    if *armed == Some(point) {
        *armed = None;
        return Err(StoreError::Unavailable(format!("injected fault at {point:?}")));
    }
    Ok(())
}

/// Transaction over an [`InMemoryStore`].
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
    fault: Arc<Mutex<Option<FaultPoint>>>,
    decrements: usize,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn get_cart(&mut self, user_id: UserId) -> Result<Option<Cart>> {
        Ok(self.staged.carts.get(&user_id).cloned())
    }

    async fn save_cart(&mut self, cart: &Cart) -> Result<()> {
        self.staged.carts.insert(cart.user_id, cart.clone());
        Ok(())
    }

    async fn clear_cart(&mut self, cart_id: CartId) -> Result<()> {
        trip(&self.fault, FaultPoint::ClearCart).await?;
        if let Some(cart) = self.staged.carts.values_mut().find(|c| c.id == cart_id) {
            cart.clear();
        }
        Ok(())
    }

    async fn lock_books(&mut self, book_ids: &[BookId]) -> Result<Vec<Book>> {
        let mut ids = book_ids.to_vec();
        ids.sort();
        ids.dedup();
        Ok(ids
            .into_iter()
            .filter_map(|id| self.staged.books.get(&id).cloned())
            .collect())
    }

    async fn get_book(&mut self, book_id: BookId) -> Result<Option<Book>> {
        Ok(self.staged.books.get(&book_id).cloned())
    }

    async fn decrement_if_available(&mut self, book_id: BookId, quantity: u32) -> Result<bool> {
        trip(
            &self.fault,
            FaultPoint::StockDecrement {
                after: self.decrements,
            },
        )
        .await?;

        let taken = self
            .staged
            .books
            .get_mut(&book_id)
            .is_some_and(|book| book.take_stock(quantity));
        if taken {
            self.decrements += 1;
        }
        Ok(taken)
    }

    async fn restock(&mut self, book_id: BookId, quantity: u32) -> Result<()> {
        if let Some(book) = self.staged.books.get_mut(&book_id) {
            book.return_stock(quantity);
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        trip(&self.fault, FaultPoint::InsertOrder).await?;
        self.staged.orders.push(order.clone());
        Ok(())
    }

    async fn get_order_for_update(&mut self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self
            .staged
            .orders
            .iter()
            .find(|o| o.id() == order_id)
            .cloned())
    }

    async fn update_order_status(&mut self, order: &Order) -> Result<()> {
        if let Some(existing) = self.staged.orders.iter_mut().find(|o| o.id() == order.id()) {
            *existing = order.clone();
        }
        Ok(())
    }

    async fn has_review(&mut self, user_id: UserId, book_id: BookId) -> Result<bool> {
        Ok(self
            .staged
            .reviews
            .iter()
            .any(|r| r.user_id == user_id && r.book_id == book_id))
    }

    async fn insert_review(&mut self, review: &Review) -> Result<()> {
        trip(&self.fault, FaultPoint::InsertReview).await?;
        self.staged.reviews.push(review.clone());
        Ok(())
    }

    async fn ratings_for_book(&mut self, book_id: BookId) -> Result<Vec<Rating>> {
        Ok(self
            .staged
            .reviews
            .iter()
            .filter(|r| r.book_id == book_id)
            .map(|r| r.rating)
            .collect())
    }

    async fn set_average_rating(&mut self, book_id: BookId, average: f64) -> Result<()> {
        trip(&self.fault, FaultPoint::SetAverageRating).await?;
        if let Some(book) = self.staged.books.get_mut(&book_id) {
            book.average_rating = average;
        }
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        trip(&self.fault, FaultPoint::Commit).await?;
        let InMemoryTransaction {
            mut guard, staged, ..
        } = self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Transaction> {
        trip(&self.fault, FaultPoint::Begin).await?;
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(InMemoryTransaction {
            guard,
            staged,
            fault: self.fault.clone(),
            decrements: 0,
        })
    }

    async fn insert_book(&self, book: &Book) -> Result<()> {
        self.tables.lock().await.books.insert(book.id, book.clone());
        Ok(())
    }

    async fn get_book(&self, book_id: BookId) -> Result<Option<Book>> {
        Ok(self.tables.lock().await.books.get(&book_id).cloned())
    }

    async fn update_book_details(&self, book: &Book) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if let Some(stored) = tables.books.get_mut(&book.id) {
            stored.title = book.title.clone();
            stored.author = book.author.clone();
            stored.genre = book.genre.clone();
            stored.description = book.description.clone();
            stored.price = book.price;
            stored.updated_at = book.updated_at;
        }
        Ok(())
    }

    async fn list_books(&self, query: &BookQuery) -> Result<Page<Book>> {
        let tables = self.tables.lock().await;
        let needle = query.search.as_deref().map(str::to_lowercase);
        let mut books: Vec<_> = tables
            .books
            .values()
            .filter(|b| query.genre.as_deref().is_none_or(|g| b.genre == g))
            .filter(|b| query.min_price.is_none_or(|min| b.price >= min))
            .filter(|b| query.max_price.is_none_or(|max| b.price <= max))
            .filter(|b| {
                needle.as_deref().is_none_or(|n| {
                    b.title.to_lowercase().contains(n) || b.author.to_lowercase().contains(n)
                })
            })
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));

        let total = books.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = books
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .collect();

        Ok(Page {
            items,
            total,
            page: query.page,
            limit: query.limit,
        })
    }

    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        Ok(self.tables.lock().await.carts.get(&user_id).cloned())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let tables = self.tables.lock().await;
        Ok(tables.orders.iter().find(|o| o.id() == order_id).cloned())
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let tables = self.tables.lock().await;
        let mut orders: Vec<_> = tables
            .orders
            .iter()
            .filter(|o| o.user_id() == user_id)
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at());
        Ok(orders)
    }

    async fn has_eligible_order(&self, user_id: UserId, book_id: BookId) -> Result<bool> {
        let tables = self.tables.lock().await;
        Ok(tables.orders.iter().any(|o| {
            o.user_id() == user_id
                && o.status().grants_review_eligibility()
                && o.contains_book(book_id)
        }))
    }

    async fn list_reviews(&self, query: &ReviewQuery) -> Result<Page<Review>> {
        let tables = self.tables.lock().await;
        let mut reviews: Vec<_> = tables
            .reviews
            .iter()
            .filter(|r| r.book_id == query.book_id)
            .cloned()
            .collect();

        match query.sort {
            ReviewSort::Latest => reviews.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then(b.id.cmp(&a.id))
            }),
            ReviewSort::HighestRating => reviews.sort_by(|a, b| {
                b.rating
                    .cmp(&a.rating)
                    .then(b.created_at.cmp(&a.created_at))
                    .then(b.id.cmp(&a.id))
            }),
        }

        let total = reviews.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = reviews
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .collect();

        Ok(Page {
            items,
            total,
            page: query.page,
            limit: query.limit,
        })
    }
}
