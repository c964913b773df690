use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use common::{BookId, CartId, OrderId, ReviewId, UserId};
use domain::{Book, Cart, CartItem, Money, Order, OrderLine, OrderStatus, Rating, Review};
use sqlx::{
    PgConnection, PgPool, Postgres, Row,
    postgres::{PgPoolOptions, PgRow},
};
use uuid::Uuid;

use crate::{
    BookQuery, Page, Result, ReviewQuery, ReviewSort, StoreError,
    store::{Store, StoreTransaction},
};

const BOOK_COLUMNS: &str = "id, title, author, genre, description, price_cents, stock, \
                            average_rating, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, user_id, total_cents, status, created_at, updated_at";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn decode_err(what: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Decode(format!("{what}: {err}"))
}

fn row_to_book(row: &PgRow) -> Result<Book> {
    let stock: i32 = row.try_get("stock")?;
    Ok(Book {
        id: BookId::from_uuid(row.try_get("id")?),
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        genre: row.try_get("genre")?,
        description: row.try_get("description")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: u32::try_from(stock).map_err(|e| decode_err("stock", e))?,
        average_rating: row.try_get("average_rating")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_review(row: &PgRow) -> Result<Review> {
    let rating: i16 = row.try_get("rating")?;
    Ok(Review {
        id: ReviewId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        book_id: BookId::from_uuid(row.try_get("book_id")?),
        rating: Rating::new(i64::from(rating)).map_err(|e| decode_err("rating", e))?,
        comment: row.try_get("comment")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_order(row: &PgRow, items: Vec<OrderLine>) -> Result<Order> {
    let status: String = row.try_get("status")?;
    Ok(Order::restore(
        OrderId::from_uuid(row.try_get("id")?),
        UserId::from_uuid(row.try_get("user_id")?),
        items,
        Money::from_cents(row.try_get("total_cents")?),
        status.parse::<OrderStatus>().map_err(|e| decode_err("status", e))?,
        row.try_get("created_at")?,
        row.try_get("updated_at")?,
    ))
}

fn row_to_order_line(row: &PgRow) -> Result<OrderLine> {
    let quantity: i32 = row.try_get("quantity")?;
    Ok(OrderLine::new(
        BookId::from_uuid(row.try_get("book_id")?),
        u32::try_from(quantity).map_err(|e| decode_err("order item quantity", e))?,
        Money::from_cents(row.try_get("unit_price_cents")?),
    ))
}

/// Wraps `text` for a substring `ILIKE`, escaping its wildcards.
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn to_db_quantity(quantity: u32) -> Result<i32> {
    i32::try_from(quantity).map_err(|e| decode_err("quantity", e))
}

async fn load_cart(conn: &mut PgConnection, user_id: UserId, lock: bool) -> Result<Option<Cart>> {
    let sql = if lock {
        "SELECT id, user_id, updated_at FROM carts WHERE user_id = $1 FOR UPDATE"
    } else {
        "SELECT id, user_id, updated_at FROM carts WHERE user_id = $1"
    };
    let Some(row) = sqlx::query(sql)
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let cart_id: Uuid = row.try_get("id")?;
    let item_rows = sqlx::query(
        "SELECT book_id, quantity FROM cart_items WHERE cart_id = $1 ORDER BY position ASC",
    )
    .bind(cart_id)
    .fetch_all(&mut *conn)
    .await?;

    let items = item_rows
        .iter()
        .map(|r| {
            let quantity: i32 = r.try_get("quantity")?;
            Ok(CartItem {
                book_id: BookId::from_uuid(r.try_get("book_id")?),
                quantity: u32::try_from(quantity)
                    .map_err(|e| decode_err("cart item quantity", e))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(Cart {
        id: CartId::from_uuid(cart_id),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        items,
        updated_at: row.try_get("updated_at")?,
    }))
}

async fn load_order_lines(conn: &mut PgConnection, order_id: Uuid) -> Result<Vec<OrderLine>> {
    let rows = sqlx::query(
        r#"
        SELECT book_id, quantity, unit_price_cents
        FROM order_items
        WHERE order_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(row_to_order_line).collect()
}

async fn load_order(conn: &mut PgConnection, order_id: OrderId, lock: bool) -> Result<Option<Order>> {
    let sql = if lock {
        format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE")
    } else {
        format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1")
    };
    let Some(row) = sqlx::query(&sql)
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let items = load_order_lines(conn, order_id.as_uuid()).await?;
    row_to_order(&row, items).map(Some)
}

/// Transaction over a [`PostgresStore`]. Rolls back when dropped uncommitted.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn get_cart(&mut self, user_id: UserId) -> Result<Option<Cart>> {
        load_cart(&mut self.tx, user_id, true).await
    }

    async fn save_cart(&mut self, cart: &Cart) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(cart.id.as_uuid())
        .bind(cart.user_id.as_uuid())
        .bind(cart.updated_at)
        .execute(&mut *self.tx)
        .await?;

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart.id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        for (position, item) in cart.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cart_items (cart_id, book_id, quantity, position)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(cart.id.as_uuid())
            .bind(item.book_id.as_uuid())
            .bind(to_db_quantity(item.quantity)?)
            .bind(position as i32)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn clear_cart(&mut self, cart_id: CartId) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1")
            .bind(cart_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn lock_books(&mut self, book_ids: &[BookId]) -> Result<Vec<Book>> {
        let ids: Vec<Uuid> = book_ids.iter().map(BookId::as_uuid).collect();
        let rows = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        ))
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_book).collect()
    }

    async fn get_book(&mut self, book_id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
            .bind(book_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(row_to_book).transpose()
    }

    async fn decrement_if_available(&mut self, book_id: BookId, quantity: u32) -> Result<bool> {
        let Ok(quantity) = i32::try_from(quantity) else {
            return Ok(false);
        };
        let result = sqlx::query(
            r#"
            UPDATE books
            SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            "#,
        )
        .bind(book_id.as_uuid())
        .bind(quantity)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn restock(&mut self, book_id: BookId, quantity: u32) -> Result<()> {
        sqlx::query("UPDATE books SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
            .bind(book_id.as_uuid())
            .bind(to_db_quantity(quantity)?)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, total_cents, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.user_id().as_uuid())
        .bind(order.total_amount().cents())
        .bind(order.status().as_str())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *self.tx)
        .await?;

        for (position, line) in order.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, book_id, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id().as_uuid())
            .bind(position as i32)
            .bind(line.book_id.as_uuid())
            .bind(to_db_quantity(line.quantity)?)
            .bind(line.unit_price.cents())
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn get_order_for_update(&mut self, order_id: OrderId) -> Result<Option<Order>> {
        load_order(&mut self.tx, order_id, true).await
    }

    async fn update_order_status(&mut self, order: &Order) -> Result<()> {
        sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(order.id().as_uuid())
            .bind(order.status().as_str())
            .bind(order.updated_at())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn has_review(&mut self, user_id: UserId, book_id: BookId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM reviews WHERE user_id = $1 AND book_id = $2)",
        )
        .bind(user_id.as_uuid())
        .bind(book_id.as_uuid())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn insert_review(&mut self, review: &Review) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, user_id, book_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(review.id.as_uuid())
        .bind(review.user_id.as_uuid())
        .bind(review.book_id.as_uuid())
        .bind(i16::from(review.rating.value()))
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn ratings_for_book(&mut self, book_id: BookId) -> Result<Vec<Rating>> {
        let raw: Vec<i16> = sqlx::query_scalar("SELECT rating FROM reviews WHERE book_id = $1")
            .bind(book_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await?;

        raw.into_iter()
            .map(|r| Rating::new(i64::from(r)).map_err(|e| decode_err("rating", e)))
            .collect()
    }

    async fn set_average_rating(&mut self, book_id: BookId, average: f64) -> Result<()> {
        sqlx::query("UPDATE books SET average_rating = $2 WHERE id = $1")
            .bind(book_id.as_uuid())
            .bind(average)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        tracing::debug!("transaction committed");
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        tracing::debug!("transaction rolled back");
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Transaction = PostgresTransaction;

    async fn begin(&self) -> Result<Self::Transaction> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx })
    }

    async fn insert_book(&self, book: &Book) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (id, title, author, genre, description, price_cents, stock,
                               average_rating, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(book.id.as_uuid())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(&book.description)
        .bind(book.price.cents())
        .bind(to_db_quantity(book.stock)?)
        .bind(book.average_rating)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_book(&self, book_id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
            .bind(book_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_book).transpose()
    }

    async fn update_book_details(&self, book: &Book) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE books
            SET title = $2, author = $3, genre = $4, description = $5,
                price_cents = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(book.id.as_uuid())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(&book.description)
        .bind(book.price.cents())
        .bind(book.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_books(&self, query: &BookQuery) -> Result<Page<Book>> {
        let pattern = query.search.as_deref().map(like_pattern);
        let filter = r#"
            WHERE ($1::text IS NULL OR genre = $1)
              AND ($2::bigint IS NULL OR price_cents >= $2)
              AND ($3::bigint IS NULL OR price_cents <= $3)
              AND ($4::text IS NULL OR title ILIKE $4 OR author ILIKE $4)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM books {filter}"))
            .bind(query.genre.as_deref())
            .bind(query.min_price.map(|m| m.cents()))
            .bind(query.max_price.map(|m| m.cents()))
            .bind(pattern.as_deref())
            .fetch_one(&self.pool)
            .await?;

        let offset = i64::try_from(query.offset()).map_err(|e| decode_err("offset", e))?;
        let rows = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books {filter} ORDER BY title ASC, id ASC LIMIT $5 OFFSET $6"
        ))
        .bind(query.genre.as_deref())
        .bind(query.min_price.map(|m| m.cents()))
        .bind(query.max_price.map(|m| m.cents()))
        .bind(pattern.as_deref())
        .bind(i64::from(query.limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items: rows.iter().map(row_to_book).collect::<Result<Vec<_>>>()?,
            total: u64::try_from(total).map_err(|e| decode_err("book count", e))?,
            page: query.page,
            limit: query.limit,
        })
    }

    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        let mut conn = self.pool.acquire().await?;
        load_cart(&mut conn, user_id, false).await
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        load_order(&mut conn, order_id, false).await
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&mut *conn)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids = rows
            .iter()
            .map(|r| r.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let line_rows = sqlx::query(
            r#"
            SELECT order_id, book_id, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut lines: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for row in &line_rows {
            let order_id: Uuid = row.try_get("order_id")?;
            lines.entry(order_id).or_default().push(row_to_order_line(row)?);
        }

        rows.iter()
            .zip(ids)
            .map(|(row, id)| row_to_order(row, lines.remove(&id).unwrap_or_default()))
            .collect()
    }

    async fn has_eligible_order(&self, user_id: UserId, book_id: BookId) -> Result<bool> {
        let eligible: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM orders o
                JOIN order_items i ON i.order_id = o.id
                WHERE o.user_id = $1 AND i.book_id = $2 AND o.status <> $3
            )
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(book_id.as_uuid())
        .bind(OrderStatus::Cancelled.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(eligible)
    }

    async fn list_reviews(&self, query: &ReviewQuery) -> Result<Page<Review>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE book_id = $1")
            .bind(query.book_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        let order_by = match query.sort {
            ReviewSort::Latest => "created_at DESC, id DESC",
            ReviewSort::HighestRating => "rating DESC, created_at DESC, id DESC",
        };
        let offset = i64::try_from(query.offset()).map_err(|e| decode_err("offset", e))?;
        let rows = sqlx::query(&format!(
            r#"
            SELECT id, user_id, book_id, rating, comment, created_at
            FROM reviews
            WHERE book_id = $1
            ORDER BY {order_by}
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(query.book_id.as_uuid())
        .bind(i64::from(query.limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items: rows.iter().map(row_to_review).collect::<Result<Vec<_>>>()?,
            total: u64::try_from(total).map_err(|e| decode_err("review count", e))?,
            page: query.page,
            limit: query.limit,
        })
    }
}

