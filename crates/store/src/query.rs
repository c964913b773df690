use common::BookId;
use domain::Money;

/// Default page size for review listings.
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// Default page size for catalog listings.
pub const DEFAULT_BOOK_PAGE_SIZE: u32 = 10;

/// Largest page size a caller may ask for.
pub const MAX_PAGE_SIZE: u32 = 50;

fn offset_of(page: u32, limit: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(limit)
}

/// Ordering for review listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewSort {
    /// Newest first.
    #[default]
    Latest,
    /// Highest rating first, newest first among equal ratings.
    HighestRating,
}

impl std::str::FromStr for ReviewSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" => Ok(ReviewSort::Latest),
            "highest" => Ok(ReviewSort::HighestRating),
            other => Err(format!("unknown sort '{other}' (expected 'latest' or 'highest')")),
        }
    }
}

/// Builder for a page of reviews for one book.
///
/// Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewQuery {
    /// The book whose reviews are listed.
    pub book_id: BookId,

    /// Result ordering.
    pub sort: ReviewSort,

    /// 1-based page number.
    pub page: u32,

    /// Maximum number of reviews per page.
    pub limit: u32,
}

impl ReviewQuery {
    /// Creates a query for the first page of a book's reviews.
    pub fn for_book(book_id: BookId) -> Self {
        Self {
            book_id,
            sort: ReviewSort::default(),
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the ordering.
    pub fn sort(mut self, sort: ReviewSort) -> Self {
        self.sort = sort;
        self
    }

    /// Sets the page number.
    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Sets the page size.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        offset_of(self.page, self.limit)
    }
}

/// Catalog filter and page, ordered by title.
///
/// Every filter is optional; `min_price` and `max_price` are inclusive and
/// `search` matches title or author case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookQuery {
    pub genre: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub search: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for BookQuery {
    fn default() -> Self {
        Self {
            genre: None,
            min_price: None,
            max_price: None,
            search: None,
            page: 1,
            limit: DEFAULT_BOOK_PAGE_SIZE,
        }
    }
}

impl BookQuery {
    /// Creates an unfiltered query for the first page.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn min_price(mut self, price: Money) -> Self {
        self.min_price = Some(price);
        self
    }

    pub fn max_price(mut self, price: Money) -> Self {
        self.max_price = Some(price);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        offset_of(self.page, self.limit)
    }
}

/// One page of results plus the total count across all pages.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    /// Number of pages needed to show `total` items.
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.limit))
    }
}
