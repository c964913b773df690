//! Review endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{Operation, Resource, Review, authorize};
use reviews::ReviewSubmission;
use serde::{Deserialize, Serialize};
use store::{DEFAULT_PAGE_SIZE, ReviewSort, Store};

use crate::error::ApiError;
use crate::extract::{ValidJson, ValidQuery};
use crate::identity::Caller;
use crate::routes::parse_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReviewListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
}

#[derive(Serialize)]
pub struct ReviewListResponse {
    pub total_reviews: u64,
    pub current_page: u32,
    pub total_pages: u64,
    pub reviews: Vec<Review>,
}

/// GET /api/v1/books/{book_id}/reviews — paginated, `latest` or `highest` first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(book_id): Path<String>,
    ValidQuery(params): ValidQuery<ReviewListParams>,
) -> Result<Json<ReviewListResponse>, ApiError> {
    let book_id = parse_id(&book_id, "book id")?;
    let sort = match params.sort.as_deref() {
        Some(raw) => raw.parse::<ReviewSort>().map_err(ApiError::BadRequest)?,
        None => ReviewSort::default(),
    };

    let page = state
        .reviews
        .list_reviews(
            book_id,
            sort,
            params.page.unwrap_or(1),
            params.limit.unwrap_or(i64::from(DEFAULT_PAGE_SIZE)),
        )
        .await?;

    Ok(Json(ReviewListResponse {
        total_reviews: page.total,
        current_page: page.page,
        total_pages: page.total_pages(),
        reviews: page.items,
    }))
}

/// POST /api/v1/books/{book_id}/reviews — review a purchased book.
#[tracing::instrument(skip(state, caller, submission), fields(user_id = %caller.0.user_id))]
pub async fn submit<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(book_id): Path<String>,
    ValidJson(submission): ValidJson<ReviewSubmission>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    let Caller(identity) = caller;
    authorize(&identity, Operation::SubmitReview, Resource::Own)?;

    let book_id = parse_id(&book_id, "book id")?;
    let review = state
        .reviews
        .submit_review(identity.user_id, book_id, submission)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}
