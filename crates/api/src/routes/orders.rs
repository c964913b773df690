//! Order placement, listing and cancellation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{DomainError, Operation, Order, Resource, authorize};
use serde::Serialize;
use store::Store;

use crate::error::ApiError;
use crate::identity::Caller;
use crate::routes::parse_id;
use crate::state::AppState;

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub items: Vec<OrderLineResponse>,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub book_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl TryFrom<&Order> for OrderResponse {
    type Error = DomainError;

    fn try_from(order: &Order) -> Result<Self, Self::Error> {
        let items = order
            .items()
            .iter()
            .map(|line| {
                Ok(OrderLineResponse {
                    book_id: line.book_id.to_string(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price.cents(),
                    line_total_cents: line.line_total()?.cents(),
                })
            })
            .collect::<Result<_, DomainError>>()?;

        Ok(Self {
            id: order.id().to_string(),
            user_id: order.user_id().to_string(),
            status: order.status().to_string(),
            items,
            total_cents: order.total_amount().cents(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        })
    }
}

// -- Handlers --

/// POST /api/v1/orders — check out the caller's cart.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.0.user_id))]
pub async fn place<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Caller(identity) = caller;
    authorize(&identity, Operation::PlaceOrder, Resource::Own)?;

    let order = state.checkout.place_order(identity.user_id).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::try_from(&order)?)))
}

/// GET /api/v1/orders — the caller's orders, oldest first.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.0.user_id))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let Caller(identity) = caller;
    authorize(&identity, Operation::ListOrders, Resource::Own)?;

    let orders = state.checkout.list_orders(identity.user_id).await?;
    let body = orders
        .iter()
        .map(OrderResponse::try_from)
        .collect::<Result<_, _>>()?;
    Ok(Json(body))
}

/// PATCH /api/v1/orders/{id}/cancel — cancel a placed order.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.0.user_id))]
pub async fn cancel<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_id(&id, "order id")?;
    let order = state.checkout.cancel_order(&caller.0, order_id).await?;
    Ok(Json(OrderResponse::try_from(&order)?))
}
