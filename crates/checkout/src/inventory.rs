//! Stock reservation inside an open store transaction.

use std::collections::HashMap;

use common::BookId;
use domain::{Book, CartItem, OrderLine};
use store::StoreTransaction;

use crate::error::{CheckoutError, Result};

/// Checks every cart line against the locked books without touching stock.
///
/// Fails on the first line whose book is missing or whose quantity exceeds
/// current stock.
pub fn check_availability(books: &HashMap<BookId, Book>, items: &[CartItem]) -> Result<()> {
    for item in items {
        let book = books
            .get(&item.book_id)
            .ok_or(CheckoutError::BookNotFound(item.book_id))?;
        if !book.has_stock(item.quantity) {
            return Err(CheckoutError::InsufficientStock {
                book_id: item.book_id,
                requested: item.quantity,
                available: book.stock,
            });
        }
    }
    Ok(())
}

/// Takes stock for every cart line and returns the priced order lines.
///
/// Each line's unit price is the book's price at this moment. The caller
/// must roll the transaction back on error; decrements already applied are
/// not undone here.
pub async fn reserve<T: StoreTransaction>(
    tx: &mut T,
    books: &HashMap<BookId, Book>,
    items: &[CartItem],
) -> Result<Vec<OrderLine>> {
    check_availability(books, items)?;

    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let book = books
            .get(&item.book_id)
            .ok_or(CheckoutError::BookNotFound(item.book_id))?;

        if !tx.decrement_if_available(item.book_id, item.quantity).await? {
            return Err(CheckoutError::InsufficientStock {
                book_id: item.book_id,
                requested: item.quantity,
                available: book.stock,
            });
        }
        tracing::debug!(book_id = %item.book_id, quantity = item.quantity, "stock reserved");

        lines.push(OrderLine::new(item.book_id, item.quantity, book.price));
    }
    Ok(lines)
}

/// Returns every line's quantity to stock.
pub async fn restock<T: StoreTransaction>(tx: &mut T, lines: &[OrderLine]) -> Result<()> {
    for line in lines {
        tx.restock(line.book_id, line.quantity).await?;
        tracing::debug!(book_id = %line.book_id, quantity = line.quantity, "stock returned");
    }
    Ok(())
}
