//! Shopping carts.

use chrono::{DateTime, Utc};
use common::{BookId, CartId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A pending line item in a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub book_id: BookId,
    pub quantity: u32,
}

/// A user's cart. One per user, created on first add.
///
/// An empty cart means the same thing as no cart at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart for a user.
    pub fn new(user_id: UserId) -> Self {
        Self {
            id: CartId::new(),
            user_id,
            items: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Adds `quantity` of a book, merging with an existing line.
    pub fn add(&mut self, book_id: BookId, quantity: u32) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity: 0 });
        }
        match self.items.iter_mut().find(|item| item.book_id == book_id) {
            Some(item) => item.quantity = item.quantity.saturating_add(quantity),
            None => self.items.push(CartItem { book_id, quantity }),
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Removes a book's line. Returns true if a line was removed.
    pub fn remove(&mut self, book_id: BookId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.book_id != book_id);
        self.updated_at = Utc::now();
        self.items.len() != before
    }

    /// Empties the cart without deleting it.
    pub fn clear(&mut self) {
        self.items.clear();
        self.updated_at = Utc::now();
    }

    /// Returns the current quantity of a book in the cart.
    pub fn quantity_of(&self, book_id: BookId) -> u32 {
        self.items
            .iter()
            .find(|item| item.book_id == book_id)
            .map_or(0, |item| item.quantity)
    }

    /// Returns true if the cart has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the sum of all line quantities.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// Validates a raw quantity coming from a caller.
pub fn validate_quantity(quantity: i64) -> Result<u32, DomainError> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or(DomainError::InvalidQuantity { quantity })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_merges_existing_line() {
        let mut cart = Cart::new(UserId::new());
        let book = BookId::new();

        cart.add(book, 2).unwrap();
        cart.add(book, 3).unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.quantity_of(book), 5);
    }

    #[test]
    fn add_preserves_insertion_order() {
        let mut cart = Cart::new(UserId::new());
        let first = BookId::new();
        let second = BookId::new();

        cart.add(first, 1).unwrap();
        cart.add(second, 1).unwrap();

        assert_eq!(cart.items[0].book_id, first);
        assert_eq!(cart.items[1].book_id, second);
    }

    #[test]
    fn remove_and_clear() {
        let mut cart = Cart::new(UserId::new());
        let book = BookId::new();
        cart.add(book, 1).unwrap();

        assert!(!cart.remove(BookId::new()));
        assert!(cart.remove(book));
        assert!(cart.is_empty());

        cart.add(book, 4).unwrap();
        cart.clear();
        assert_eq!(cart.total_quantity(), 0);
    }

    #[test]
    fn validate_quantity_rejects_non_positive() {
        assert_eq!(validate_quantity(3), Ok(3));
        assert_eq!(
            validate_quantity(0),
            Err(DomainError::InvalidQuantity { quantity: 0 })
        );
        assert_eq!(
            validate_quantity(-2),
            Err(DomainError::InvalidQuantity { quantity: -2 })
        );
    }
}
