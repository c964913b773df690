//! Orders and their line items.

mod state;

pub use state::OrderStatus;

use chrono::{DateTime, Utc};
use common::{BookId, OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

/// A committed order line with the price snapshotted at purchase time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub book_id: BookId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    /// Creates a new order line.
    pub fn new(book_id: BookId, quantity: u32, unit_price: Money) -> Self {
        Self {
            book_id,
            quantity,
            unit_price,
        }
    }

    /// Returns quantity * unit_price.
    pub fn line_total(&self) -> Result<Money, DomainError> {
        self.unit_price
            .checked_mul(self.quantity)
            .ok_or(DomainError::AmountOverflow)
    }
}

/// An order record.
///
/// Line items and total are fixed at creation; only the status moves.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    items: Vec<OrderLine>,
    total_amount: Money,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a freshly placed order, computing its total.
    pub fn place(user_id: UserId, items: Vec<OrderLine>) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::NoItems);
        }
        if let Some(line) = items.iter().find(|line| line.quantity == 0) {
            return Err(DomainError::InvalidQuantity {
                quantity: i64::from(line.quantity),
            });
        }

        let total_amount = items.iter().try_fold(Money::zero(), |total, line| {
            total
                .checked_add(line.line_total()?)
                .ok_or(DomainError::AmountOverflow)
        })?;
        let now = Utc::now();
        Ok(Self {
            id: OrderId::new(),
            user_id,
            items,
            total_amount,
            status: OrderStatus::Placed,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuilds an order from persisted fields without recomputing anything.
    pub fn restore(
        id: OrderId,
        user_id: UserId,
        items: Vec<OrderLine>,
        total_amount: Money,
        status: OrderStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            items,
            total_amount,
            status,
            created_at,
            updated_at,
        }
    }

    /// Moves the order to `Cancelled`.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.status = self.status.transition_to(OrderStatus::Cancelled)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[OrderLine] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the total quantity across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    /// Returns true if any line is for `book_id`.
    pub fn contains_book(&self, book_id: BookId) -> bool {
        self.items.iter().any(|line| line.book_id == book_id)
    }
}
