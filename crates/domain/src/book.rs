//! Catalog books and their inventory counters.

use chrono::{DateTime, Utc};
use common::BookId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

/// A book in the catalog.
///
/// Descriptive fields and price belong to the catalog. `stock` is only
/// changed through [`Book::take_stock`] / [`Book::return_stock`], and
/// `average_rating` only by the rating aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: u32,
    pub average_rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Creates a catalog entry from validated input.
    pub fn create(new: NewBook) -> Result<Self, DomainError> {
        new.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: BookId::new(),
            title: new.title,
            author: new.author,
            genre: new.genre,
            description: new.description,
            price: new.price,
            stock: new.stock,
            average_rating: 0.0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns true if `quantity` units can be taken right now.
    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }

    /// Conditionally removes `quantity` units.
    ///
    /// Returns false and leaves the count untouched when stock is short.
    pub fn take_stock(&mut self, quantity: u32) -> bool {
        match self.stock.checked_sub(quantity) {
            Some(remaining) => {
                self.stock = remaining;
                self.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Puts `quantity` units back on the shelf.
    pub fn return_stock(&mut self, quantity: u32) {
        self.stock = self.stock.saturating_add(quantity);
        self.updated_at = Utc::now();
    }

    /// Applies a catalog edit. Stock and rating are not editable here.
    pub fn apply_update(&mut self, update: BookUpdate) -> Result<(), DomainError> {
        update.validate()?;
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(author) = update.author {
            self.author = author;
        }
        if let Some(genre) = update.genre {
            self.genre = genre;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Input for creating a book.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    pub stock: u32,
}

impl NewBook {
    /// Checks required fields and price.
    pub fn validate(&self) -> Result<(), DomainError> {
        require_text("title", &self.title)?;
        require_text("author", &self.author)?;
        require_text("genre", &self.genre)?;
        require_non_negative(self.price)
    }
}

/// Partial catalog edit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
}

impl BookUpdate {
    fn validate(&self) -> Result<(), DomainError> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if let Some(author) = &self.author {
            require_text("author", author)?;
        }
        if let Some(genre) = &self.genre {
            require_text("genre", genre)?;
        }
        if let Some(price) = self.price {
            require_non_negative(price)?;
        }
        Ok(())
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::MissingField(field));
    }
    Ok(())
}

fn require_non_negative(price: Money) -> Result<(), DomainError> {
    if price.is_negative() {
        return Err(DomainError::NegativePrice {
            cents: price.cents(),
        });
    }
    Ok(())
}
