//! Checkout against PostgreSQL row locks.
//!
//! These tests share one PostgreSQL container and need a Docker daemon:
//!
//! ```bash
//! cargo test -p checkout --test postgres_checkout -- --ignored
//! ```

use std::sync::Arc;

use checkout::{CartService, CheckoutConfig, CheckoutCoordinator, CheckoutError};
use common::UserId;
use domain::{Book, Cart, Money, NewBook};
use futures_util::future::join_all;
use serial_test::serial;
use store::{PostgresStore, Store, StoreTransaction};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();
            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();
            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let store = PostgresStore::connect(&connection_string, 1).await.unwrap();
            store.run_migrations().await.unwrap();
            store.pool().close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;
    let store = PostgresStore::connect(&info.connection_string, 16)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE reviews, order_items, orders, cart_items, carts, books")
        .execute(store.pool())
        .await
        .unwrap();

    store
}

async fn seed_book(store: &PostgresStore, stock: u32) -> Book {
    let book = Book::create(NewBook {
        title: "Crafting Interpreters".to_string(),
        author: "Robert Nystrom".to_string(),
        genre: "Programming".to_string(),
        description: None,
        price: Money::from_cents(3900),
        stock,
    })
    .unwrap();
    store.insert_book(&book).await.unwrap();
    book
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[serial]
#[ignore = "requires Docker"]
async fn test_last_unit_sells_exactly_once_on_postgres() {
    let store = get_test_store().await;
    let book = seed_book(&store, 1).await;
    let coordinator = CheckoutCoordinator::new(store.clone(), CheckoutConfig::default());

    let mut users = Vec::new();
    for _ in 0..8 {
        let user = UserId::new();
        let mut cart = Cart::new(user);
        cart.add(book.id, 1).unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.save_cart(&cart).await.unwrap();
        tx.commit().await.unwrap();
        users.push(user);
    }

    let handles = users.iter().map(|&user| {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.place_order(user).await })
    });
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let placed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(placed, 1);
    for result in results.iter().filter(|r| r.is_err()) {
        assert!(matches!(
            result,
            Err(CheckoutError::InsufficientStock { .. })
        ));
    }
    assert_eq!(store.get_book(book.id).await.unwrap().unwrap().stock, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
#[ignore = "requires Docker"]
async fn test_cart_edits_and_checkout_do_not_deadlock() {
    let store = get_test_store().await;
    let book = seed_book(&store, 100).await;
    let coordinator = CheckoutCoordinator::new(store.clone(), CheckoutConfig::default());
    let carts = CartService::new(store.clone());
    let user = UserId::new();
    carts.add_to_cart(user, book.id, 1).await.unwrap();

    for _ in 0..10 {
        let (added, placed) = tokio::join!(
            carts.add_to_cart(user, book.id, 1),
            coordinator.place_order(user)
        );

        assert!(added.is_ok(), "add failed: {added:?}");
        assert!(
            !matches!(placed, Err(CheckoutError::Store(_))),
            "checkout hit a storage error: {placed:?}"
        );
    }
}
