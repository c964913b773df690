//! Review submission and listing.

use common::{BookId, UserId};
use domain::{Rating, Review};
use serde::Deserialize;
use store::{MAX_PAGE_SIZE, Page, ReviewQuery, ReviewSort, Store, StoreTransaction, finish};

use crate::aggregator::RatingAggregator;
use crate::config::{DuplicateReviewPolicy, ReviewConfig};
use crate::eligibility::can_review;
use crate::error::{Result, ReviewError};

/// Input for a new review.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewSubmission {
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Accepts reviews from eligible buyers and keeps book ratings current.
#[derive(Clone)]
pub struct ReviewService<S: Store + Clone> {
    store: S,
    aggregator: RatingAggregator<S>,
    config: ReviewConfig,
}

impl<S: Store + Clone> ReviewService<S> {
    /// Creates a new review service.
    pub fn new(store: S, config: ReviewConfig) -> Self {
        Self {
            aggregator: RatingAggregator::new(store.clone()),
            store,
            config,
        }
    }

    /// Records a review and recomputes the book's average rating.
    ///
    /// Checks run in this order: rating range, book existence, purchase
    /// eligibility, duplicate policy. The review insert and the new average
    /// commit in one transaction that holds the book's row lock, so two
    /// submissions for the same book run one after the other.
    #[tracing::instrument(skip(self, submission), fields(rating = submission.rating))]
    pub async fn submit_review(
        &self,
        user_id: UserId,
        book_id: BookId,
        submission: ReviewSubmission,
    ) -> Result<Review> {
        let rating = Rating::new(submission.rating)?;

        if self.store.get_book(book_id).await?.is_none() {
            return Err(ReviewError::BookNotFound(book_id));
        }

        if !can_review(&self.store, user_id, book_id).await? {
            return Err(ReviewError::NotPurchased { user_id, book_id });
        }

        let review = Review::new(user_id, book_id, rating, submission.comment);
        let mut tx = self.store.begin().await?;
        let result = self.write_review(&mut tx, &review).await;
        let average = finish(tx, result).await?;

        metrics::counter!("reviews_submitted_total").increment(1);
        tracing::info!(review_id = %review.id, average, "review submitted");
        Ok(review)
    }

    async fn write_review(&self, tx: &mut S::Transaction, review: &Review) -> Result<f64> {
        let (user_id, book_id) = (review.user_id, review.book_id);

        if tx.lock_books(&[book_id]).await?.is_empty() {
            return Err(ReviewError::BookNotFound(book_id));
        }

        if tx.has_review(user_id, book_id).await? {
            match self.config.duplicate_reviews {
                DuplicateReviewPolicy::Allow => {
                    tracing::warn!("user already reviewed this book; accepting another review");
                }
                DuplicateReviewPolicy::Reject => {
                    return Err(ReviewError::DuplicateReview { user_id, book_id });
                }
            }
        }

        tx.insert_review(review).await?;
        RatingAggregator::<S>::recompute_in(tx, book_id).await
    }

    /// Returns one page of a book's reviews.
    ///
    /// `page` starts at 1 and `limit` must be between 1 and
    /// [`MAX_PAGE_SIZE`].
    #[tracing::instrument(skip(self))]
    pub async fn list_reviews(
        &self,
        book_id: BookId,
        sort: ReviewSort,
        page: i64,
        limit: i64,
    ) -> Result<Page<Review>> {
        let page = u32::try_from(page)
            .ok()
            .filter(|p| *p >= 1)
            .ok_or(ReviewError::InvalidPage(page))?;
        let limit = u32::try_from(limit)
            .ok()
            .filter(|l| (1..=MAX_PAGE_SIZE).contains(l))
            .ok_or(ReviewError::InvalidLimit {
                limit,
                max: MAX_PAGE_SIZE,
            })?;

        let query = ReviewQuery::for_book(book_id)
            .sort(sort)
            .page(page)
            .limit(limit);
        Ok(self.store.list_reviews(&query).await?)
    }

    /// Returns the aggregator used after each review write.
    pub fn aggregator(&self) -> &RatingAggregator<S> {
        &self.aggregator
    }
}
