//! Book reviews and ratings.

use chrono::{DateTime, Utc};
use common::{BookId, ReviewId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A star rating from 1 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Validates a raw rating.
    pub fn new(rating: i64) -> Result<Self, DomainError> {
        u8::try_from(rating)
            .ok()
            .filter(|r| (Self::MIN..=Self::MAX).contains(r))
            .map(Self)
            .ok_or(DomainError::InvalidRating { rating })
    }

    /// Returns the rating value.
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// A user's review of a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub rating: Rating,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Creates a new review timestamped now.
    pub fn new(user_id: UserId, book_id: BookId, rating: Rating, comment: Option<String>) -> Self {
        Self {
            id: ReviewId::new(),
            user_id,
            book_id,
            rating,
            comment: comment.filter(|c| !c.trim().is_empty()),
            created_at: Utc::now(),
        }
    }
}

/// Unweighted arithmetic mean of the ratings; 0 when there are none.
pub fn mean_rating(ratings: &[Rating]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: u64 = ratings.iter().map(|r| u64::from(r.value())).sum();
    sum as f64 / ratings.len() as f64
}
