//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::BookId;
use domain::{Cart, Operation, Resource, authorize};
use serde::Deserialize;
use store::Store;

use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::identity::Caller;
use crate::routes::parse_id;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AddToCartRequest {
    pub book_id: BookId,
    pub quantity: i64,
}

/// GET /api/v1/cart — the caller's cart; empty when none exists.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.0.user_id))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
) -> Result<Json<Cart>, ApiError> {
    let Caller(identity) = caller;
    authorize(&identity, Operation::ManageCart, Resource::Own)?;

    Ok(Json(state.carts.get_cart(identity.user_id).await?))
}

/// POST /api/v1/cart — add copies of a book.
#[tracing::instrument(skip(state, caller, req), fields(user_id = %caller.0.user_id))]
pub async fn add<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    ValidJson(req): ValidJson<AddToCartRequest>,
) -> Result<Json<Cart>, ApiError> {
    let Caller(identity) = caller;
    authorize(&identity, Operation::ManageCart, Resource::Own)?;

    let cart = state
        .carts
        .add_to_cart(identity.user_id, req.book_id, req.quantity)
        .await?;
    Ok(Json(cart))
}

/// DELETE /api/v1/cart/{book_id} — drop a book from the cart.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.0.user_id))]
pub async fn remove<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(book_id): Path<String>,
) -> Result<Json<Cart>, ApiError> {
    let Caller(identity) = caller;
    authorize(&identity, Operation::ManageCart, Resource::Own)?;

    let book_id = parse_id(&book_id, "book id")?;
    Ok(Json(
        state.carts.remove_from_cart(identity.user_id, book_id).await?,
    ))
}
