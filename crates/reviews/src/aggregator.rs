//! Average rating maintenance.

use common::BookId;
use domain::mean_rating;
use store::{Store, StoreTransaction, finish};

use crate::error::Result;

/// Recomputes a book's average rating from all of its reviews.
#[derive(Clone)]
pub struct RatingAggregator<S: Store> {
    store: S,
}

impl<S: Store> RatingAggregator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Recomputes the average in a transaction of its own.
    #[tracing::instrument(skip(self))]
    pub async fn recompute_average(&self, book_id: BookId) -> Result<f64> {
        let mut tx = self.store.begin().await?;
        let result = Self::recompute_in(&mut tx, book_id).await;
        finish(tx, result).await
    }

    /// Reads every rating for the book inside `tx`, stores their mean on the
    /// book and returns it. A book with no reviews gets 0.
    ///
    /// Ratings written earlier in the same transaction are included, so a
    /// review and the average it produces commit together.
    pub async fn recompute_in(tx: &mut S::Transaction, book_id: BookId) -> Result<f64> {
        let ratings = tx.ratings_for_book(book_id).await?;
        let average = mean_rating(&ratings);
        tx.set_average_rating(book_id, average).await?;

        metrics::counter!("rating_recomputations_total").increment(1);
        tracing::debug!(reviews = ratings.len(), average, "average rating updated");
        Ok(average)
    }
}
