//! Book reviews and the ratings derived from them.
//!
//! A review may only be written by a user who bought the book in an order
//! that has not been cancelled. Every review write is followed by a
//! recomputation of the book's average rating.

pub mod aggregator;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod service;

pub use aggregator::RatingAggregator;
pub use config::{DuplicateReviewPolicy, ReviewConfig};
pub use eligibility::can_review;
pub use error::{Result, ReviewError};
pub use service::{ReviewService, ReviewSubmission};
