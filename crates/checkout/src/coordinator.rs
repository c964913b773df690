//! Checkout coordinator for placing and cancelling orders.

use std::collections::HashMap;

use common::{BookId, OrderId, UserId};
use domain::{Identity, Operation, Order, Resource, authorize};
use store::{Store, StoreTransaction, finish};

use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, Result};
use crate::inventory;

/// Turns carts into orders and drives order cancellation.
///
/// Every operation runs in one store transaction. Stock decrements, the new
/// order and the emptied cart become visible together, and a failure at any
/// step leaves all three as they were.
#[derive(Clone)]
pub struct CheckoutCoordinator<S: Store> {
    store: S,
    config: CheckoutConfig,
}

impl<S: Store> CheckoutCoordinator<S> {
    /// Creates a new checkout coordinator.
    pub fn new(store: S, config: CheckoutConfig) -> Self {
        Self { store, config }
    }

    /// Places an order for everything in the user's cart.
    ///
    /// Fails with [`CheckoutError::CartNotFound`] when the user has no cart,
    /// [`CheckoutError::EmptyCart`] when it has no items, and
    /// [`CheckoutError::InsufficientStock`] when any line exceeds current
    /// stock. No failure leaves a partial effect behind.
    #[tracing::instrument(skip(self))]
    pub async fn place_order(&self, user_id: UserId) -> Result<Order> {
        let started = std::time::Instant::now();

        let result = match self.store.begin().await {
            Ok(mut tx) => {
                let result = Self::checkout_in(&mut tx, user_id).await;
                finish(tx, result).await
            }
            Err(err) => Err(err.into()),
        };

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(order) => {
                metrics::counter!("checkout_orders_placed_total").increment(1);
                tracing::info!(
                    order_id = %order.id(),
                    total = %order.total_amount(),
                    lines = order.items().len(),
                    "order placed"
                );
            }
            Err(err) => {
                metrics::counter!("checkout_failures_total", "reason" => err.reason())
                    .increment(1);
                tracing::warn!(
                    error = %err,
                    retryable = err.is_retryable(),
                    "checkout rolled back"
                );
            }
        }
        result
    }

    async fn checkout_in(tx: &mut S::Transaction, user_id: UserId) -> Result<Order> {
        let cart = tx
            .get_cart(user_id)
            .await?
            .ok_or(CheckoutError::CartNotFound(user_id))?;

        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let book_ids: Vec<BookId> = cart.items.iter().map(|item| item.book_id).collect();
        let books: HashMap<_, _> = tx
            .lock_books(&book_ids)
            .await?
            .into_iter()
            .map(|book| (book.id, book))
            .collect();

        let lines = inventory::reserve(tx, &books, &cart.items).await?;
        let order = Order::place(user_id, lines)?;

        tx.insert_order(&order).await?;
        tx.clear_cart(cart.id).await?;
        Ok(order)
    }

    /// Cancels a placed order.
    ///
    /// The caller must own the order or be an admin. When
    /// [`CheckoutConfig::restock_on_cancel`] is set the order's quantities
    /// go back to stock in the same transaction.
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn cancel_order(&self, identity: &Identity, order_id: OrderId) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let result = self.cancel_in(&mut tx, identity, order_id).await;
        let order = finish(tx, result).await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(
            order_id = %order.id(),
            restocked = self.config.restock_on_cancel,
            "order cancelled"
        );
        Ok(order)
    }

    async fn cancel_in(
        &self,
        tx: &mut S::Transaction,
        identity: &Identity,
        order_id: OrderId,
    ) -> Result<Order> {
        let mut order = tx
            .get_order_for_update(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        authorize(
            identity,
            Operation::CancelOrder,
            Resource::Order {
                owner: order.user_id(),
            },
        )?;

        order.cancel()?;
        tx.update_order_status(&order).await?;

        if self.config.restock_on_cancel {
            inventory::restock(tx, order.items()).await?;
        }
        Ok(order)
    }

    /// Lists a user's orders, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>> {
        Ok(self.store.list_orders_for_user(user_id).await?)
    }
}
