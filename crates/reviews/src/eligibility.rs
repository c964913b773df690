//! Purchase-based review eligibility.

use common::{BookId, UserId};
use store::Store;

use crate::error::Result;

/// Returns true if the user has a placed, shipped or delivered order that
/// contains the book.
///
/// A plain read outside any transaction.
#[tracing::instrument(skip(store))]
pub async fn can_review<S: Store>(store: &S, user_id: UserId, book_id: BookId) -> Result<bool> {
    Ok(store.has_eligible_order(user_id, book_id).await?)
}
