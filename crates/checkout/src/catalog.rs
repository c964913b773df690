//! Catalog writes and lookups.

use common::BookId;
use domain::{Book, BookUpdate, Identity, NewBook, Operation, Resource, authorize};
use store::{BookQuery, MAX_PAGE_SIZE, Page, Store};

use crate::error::{CheckoutError, Result};

/// Admin-only catalog management plus public lookups.
///
/// Only descriptive fields and price are ever written here.
#[derive(Clone)]
pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds a book to the catalog.
    #[tracing::instrument(skip(self, identity, new), fields(title = %new.title))]
    pub async fn create_book(&self, identity: &Identity, new: NewBook) -> Result<Book> {
        authorize(identity, Operation::ManageCatalog, Resource::Catalog)?;

        let book = Book::create(new)?;
        self.store.insert_book(&book).await?;
        tracing::info!(book_id = %book.id, stock = book.stock, "book created");
        Ok(book)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_book(&self, book_id: BookId) -> Result<Book> {
        self.store
            .get_book(book_id)
            .await?
            .ok_or(CheckoutError::BookNotFound(book_id))
    }

    /// Lists the catalog, filtered and paged.
    ///
    /// `page` starts at 1 and `limit` must be between 1 and
    /// [`MAX_PAGE_SIZE`].
    #[tracing::instrument(skip(self))]
    pub async fn list_books(&self, query: BookQuery) -> Result<Page<Book>> {
        if query.page == 0 {
            return Err(CheckoutError::InvalidPage(query.page));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&query.limit) {
            return Err(CheckoutError::InvalidLimit {
                limit: query.limit,
                max: MAX_PAGE_SIZE,
            });
        }
        Ok(self.store.list_books(&query).await?)
    }

    /// Edits a book's descriptive fields or price.
    #[tracing::instrument(skip(self, identity, update))]
    pub async fn update_book(
        &self,
        identity: &Identity,
        book_id: BookId,
        update: BookUpdate,
    ) -> Result<Book> {
        authorize(identity, Operation::ManageCatalog, Resource::Catalog)?;

        let mut book = self.get_book(book_id).await?;
        book.apply_update(update)?;
        self.store.update_book_details(&book).await?;
        // Stock may have moved since the read.
        self.get_book(book_id).await
    }
}
