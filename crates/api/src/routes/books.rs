//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{Book, BookUpdate, Money, NewBook};
use serde::{Deserialize, Serialize};
use store::{BookQuery, DEFAULT_BOOK_PAGE_SIZE, Store};

use crate::error::ApiError;
use crate::extract::{ValidJson, ValidQuery};
use crate::identity::Caller;
use crate::routes::parse_id;
use crate::state::AppState;

/// Catalog filters. Prices are in cents and both bounds are inclusive.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookListParams {
    pub genre: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl From<BookListParams> for BookQuery {
    fn from(params: BookListParams) -> Self {
        BookQuery {
            genre: params.genre.filter(|g| !g.is_empty()),
            min_price: params.min_price.map(Money::from_cents),
            max_price: params.max_price.map(Money::from_cents),
            search: params.search.filter(|s| !s.is_empty()),
            page: params.page.unwrap_or(1),
            limit: params.limit.unwrap_or(DEFAULT_BOOK_PAGE_SIZE),
        }
    }
}

#[derive(Serialize)]
pub struct BookListResponse {
    pub total_books: u64,
    pub current_page: u32,
    pub total_pages: u64,
    pub books: Vec<Book>,
}

/// GET /api/v1/books — public catalog listing, ordered by title.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ValidQuery(params): ValidQuery<BookListParams>,
) -> Result<Json<BookListResponse>, ApiError> {
    let page = state.catalog.list_books(params.into()).await?;

    Ok(Json(BookListResponse {
        total_books: page.total,
        current_page: page.page,
        total_pages: page.total_pages(),
        books: page.items,
    }))
}

/// POST /api/v1/books — add a book (admin only).
#[tracing::instrument(skip(state, caller, new))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    ValidJson(new): ValidJson<NewBook>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let book = state.catalog.create_book(&caller.0, new).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// GET /api/v1/books/{id} — public lookup.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Book>, ApiError> {
    let book_id = parse_id(&id, "book id")?;
    Ok(Json(state.catalog.get_book(book_id).await?))
}

/// PUT /api/v1/books/{id} — edit descriptive fields or price (admin only).
#[tracing::instrument(skip(state, caller, update))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
    ValidJson(update): ValidJson<BookUpdate>,
) -> Result<Json<Book>, ApiError> {
    let book_id = parse_id(&id, "book id")?;
    let book = state.catalog.update_book(&caller.0, book_id, update).await?;
    Ok(Json(book))
}
