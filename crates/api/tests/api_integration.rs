//! Integration tests for the API server.

use std::sync::Arc;
use std::sync::OnceLock;

use api::config::Config;
use api::state::AppState;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use common::UserId;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::{FaultPoint, InMemoryStore};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    store: InMemoryStore,
    admin: UserId,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(Config::default())
    }

    fn with_config(config: Config) -> Self {
        let store = InMemoryStore::new();
        let state: Arc<AppState<InMemoryStore>> =
            api::create_default_state(store.clone(), &config);
        let app = api::create_app(state, get_metrics_handle());
        Self {
            app,
            store,
            admin: UserId::new(),
        }
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn call(
        &self,
        method: &str,
        uri: &str,
        user: Option<(UserId, &str)>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((user_id, role)) = user {
            builder = builder
                .header("x-user-id", user_id.to_string())
                .header("x-user-role", role);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.send(request).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn as_customer(
        &self,
        user: UserId,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.call(method, uri, Some((user, "customer")), body).await
    }

    async fn create_book(&self, price_cents: i64, stock: u32) -> String {
        let (status, json) = self
            .call(
                "POST",
                "/api/v1/books",
                Some((self.admin, "admin")),
                Some(json!({
                    "title": "The Rust Programming Language",
                    "author": "Klabnik & Nichols",
                    "genre": "Programming",
                    "price": price_cents,
                    "stock": stock,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        json["id"].as_str().unwrap().to_string()
    }

    async fn create_listed_book(&self, title: &str, genre: &str, price_cents: i64) {
        let (status, _) = self
            .call(
                "POST",
                "/api/v1/books",
                Some((self.admin, "admin")),
                Some(json!({
                    "title": title,
                    "author": "Various",
                    "genre": genre,
                    "price": price_cents,
                    "stock": 1,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    async fn send_raw(&self, user: UserId, uri: &str, body: &'static str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("x-user-id", user.to_string())
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = self.send(request).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn add_to_cart(&self, user: UserId, book_id: &str, quantity: i64) -> StatusCode {
        self.as_customer(
            user,
            "POST",
            "/api/v1/cart",
            Some(json!({ "book_id": book_id, "quantity": quantity })),
        )
        .await
        .0
    }

    async fn stock(&self, book_id: &str) -> u64 {
        let (_, json) = self
            .call("GET", &format!("/api/v1/books/{book_id}"), None, None)
            .await;
        json["stock"].as_u64().unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let (status, json) = app.call("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new();
    let response = app
        .send(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = TestApp::new();

    let (status, json) = app.call("POST", "/api/v1/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["kind"], "unauthenticated");

    let response = app
        .send(
            Request::builder()
                .method("GET")
                .uri("/api/v1/cart")
                .header("x-user-id", "not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_checkout_flow() {
    let app = TestApp::new();
    let user = UserId::new();
    let a = app.create_book(1000, 5).await;
    let b = app.create_book(2000, 1).await;

    assert_eq!(app.add_to_cart(user, &a, 2).await, StatusCode::OK);
    assert_eq!(app.add_to_cart(user, &b, 1).await, StatusCode::OK);

    let (status, order) = app.as_customer(user, "POST", "/api/v1/orders", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "PLACED");
    assert_eq!(order["total_cents"], 4000);
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    assert_eq!(order["items"][0]["unit_price_cents"], 1000);

    assert_eq!(app.stock(&a).await, 3);
    assert_eq!(app.stock(&b).await, 0);

    let (_, cart) = app.as_customer(user, "GET", "/api/v1/cart", None).await;
    assert!(cart["items"].as_array().unwrap().is_empty());

    let (status, orders) = app.as_customer(user, "GET", "/api/v1/orders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["id"], order["id"]);
}

#[tokio::test]
async fn test_checkout_errors() {
    let app = TestApp::new();
    let user = UserId::new();

    let (status, json) = app.as_customer(user, "POST", "/api/v1/orders", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "not_found");

    let book = app.create_book(500, 1).await;
    app.add_to_cart(user, &book, 1).await;
    let (status, _) = app
        .as_customer(user, "DELETE", &format!("/api/v1/cart/{book}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = app.as_customer(user, "POST", "/api/v1/orders", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "conflict");
    assert_eq!(json["retryable"], false);
}

#[tokio::test]
async fn test_losing_the_last_copy_is_a_conflict() {
    let app = TestApp::new();
    let first = UserId::new();
    let second = UserId::new();
    let book = app.create_book(1500, 1).await;

    app.add_to_cart(first, &book, 1).await;
    app.add_to_cart(second, &book, 1).await;

    let (status, _) = app.as_customer(first, "POST", "/api/v1/orders", None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = app.as_customer(second, "POST", "/api/v1/orders", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "conflict");

    let (_, cart) = app.as_customer(second, "GET", "/api/v1/cart", None).await;
    assert_eq!(cart["items"][0]["quantity"], 1);
    assert_eq!(app.stock(&book).await, 0);
}

#[tokio::test]
async fn test_add_to_cart_validation() {
    let app = TestApp::new();
    let user = UserId::new();
    let book = app.create_book(500, 2).await;

    assert_eq!(app.add_to_cart(user, &book, 0).await, StatusCode::BAD_REQUEST);
    assert_eq!(app.add_to_cart(user, &book, 3).await, StatusCode::CONFLICT);
    assert_eq!(
        app.add_to_cart(user, &UserId::new().to_string(), 1).await,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_cancel_order() {
    let app = TestApp::new();
    let owner = UserId::new();
    let book = app.create_book(800, 3).await;
    app.add_to_cart(owner, &book, 1).await;
    let (_, order) = app.as_customer(owner, "POST", "/api/v1/orders", None).await;
    let uri = format!("/api/v1/orders/{}/cancel", order["id"].as_str().unwrap());

    let (status, json) = app.as_customer(UserId::new(), "PATCH", &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["kind"], "authorization_error");

    let (status, json) = app.as_customer(owner, "PATCH", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "CANCELLED");

    let (status, _) = app.as_customer(owner, "PATCH", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .as_customer(owner, "PATCH", "/api/v1/orders/nope/cancel", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Restock is off by default.
    assert_eq!(app.stock(&book).await, 2);
}

#[tokio::test]
async fn test_cancel_with_restock_enabled() {
    let app = TestApp::with_config(Config {
        restock_on_cancel: true,
        ..Config::default()
    });
    let owner = UserId::new();
    let book = app.create_book(800, 3).await;
    app.add_to_cart(owner, &book, 2).await;
    let (_, order) = app.as_customer(owner, "POST", "/api/v1/orders", None).await;

    let uri = format!("/api/v1/orders/{}/cancel", order["id"].as_str().unwrap());
    let (status, _) = app
        .call("PATCH", &uri, Some((UserId::new(), "admin")), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.stock(&book).await, 3);
}

#[tokio::test]
async fn test_catalog_writes_are_admin_only() {
    let app = TestApp::new();
    let book = app.create_book(1200, 4).await;

    let (status, _) = app
        .as_customer(
            UserId::new(),
            "PUT",
            &format!("/api/v1/books/{book}"),
            Some(json!({ "price": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = app
        .call(
            "PUT",
            &format!("/api/v1/books/{book}"),
            Some((app.admin, "admin")),
            Some(json!({ "price": 999, "title": "Rust, 2nd edition" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["price"], 999);
    assert_eq!(json["title"], "Rust, 2nd edition");
    assert_eq!(json["stock"], 4);
}

#[tokio::test]
async fn test_review_flow() {
    let app = TestApp::new();
    let buyer = UserId::new();
    let book = app.create_book(2500, 10).await;
    let reviews_uri = format!("/api/v1/books/{book}/reviews");

    let (status, json) = app
        .as_customer(buyer, "POST", &reviews_uri, Some(json!({ "rating": 5 })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["kind"], "authorization_error");

    app.add_to_cart(buyer, &book, 1).await;
    app.as_customer(buyer, "POST", "/api/v1/orders", None).await;

    let (status, _) = app
        .as_customer(buyer, "POST", &reviews_uri, Some(json!({ "rating": 9 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, review) = app
        .as_customer(
            buyer,
            "POST",
            &reviews_uri,
            Some(json!({ "rating": 4, "comment": "Worth it" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(review["rating"], 4);
    assert_eq!(review["comment"], "Worth it");

    let (_, fetched) = app
        .call("GET", &format!("/api/v1/books/{book}"), None, None)
        .await;
    assert_eq!(fetched["average_rating"], 4.0);

    let (status, listing) = app
        .call("GET", &format!("{reviews_uri}?sort=highest&limit=2"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["total_reviews"], 1);
    assert_eq!(listing["current_page"], 1);
    assert_eq!(listing["total_pages"], 1);
    assert_eq!(listing["reviews"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .call("GET", &format!("{reviews_uri}?limit=51"), None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call("GET", &format!("{reviews_uri}?sort=oldest"), None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_storage_outage_is_retryable_and_opaque() {
    let app = TestApp::new();
    let user = UserId::new();
    let book = app.create_book(700, 2).await;
    app.add_to_cart(user, &book, 1).await;

    app.store.inject_fault(FaultPoint::Commit).await;
    let (status, json) = app.as_customer(user, "POST", "/api/v1/orders", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["kind"], "transient_storage_error");
    assert_eq!(json["retryable"], true);
    assert!(!json["error"].as_str().unwrap().contains("injected"));
    assert_eq!(app.stock(&book).await, 2);

    let (status, _) = app.as_customer(user, "POST", "/api/v1/orders", None).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_malformed_requests_use_the_error_body() {
    let app = TestApp::new();
    let buyer = UserId::new();
    let book = app.create_book(1500, 3).await;
    app.add_to_cart(buyer, &book, 1).await;
    app.as_customer(buyer, "POST", "/api/v1/orders", None).await;

    let (status, json) = app.send_raw(buyer, "/api/v1/cart", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation_error");
    assert_eq!(json["retryable"], false);

    let (status, json) = app
        .as_customer(buyer, "POST", "/api/v1/cart", Some(json!({ "book_id": &book })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation_error");

    let reviews_uri = format!("/api/v1/books/{book}/reviews");
    let (status, json) = app
        .as_customer(buyer, "POST", &reviews_uri, Some(json!({ "rating": 4.5 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation_error");
    assert!(json["error"].is_string());
    assert_eq!(app.store.review_count().await, 0);

    let (status, json) = app
        .call("GET", &format!("{reviews_uri}?page=abc"), None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation_error");

    let (status, json) = app.call("GET", "/api/v1/books?limit=-1", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation_error");
}

#[tokio::test]
async fn test_list_books_filters_and_pages() {
    let app = TestApp::new();
    app.create_listed_book("Dune", "Science Fiction", 1200).await;
    app.create_listed_book("Neuromancer", "Science Fiction", 900).await;
    app.create_listed_book("Hyperion", "Science Fiction", 1500).await;
    app.create_listed_book("Emma", "Classics", 700).await;

    let (status, all) = app.call("GET", "/api/v1/books", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["total_books"], 4);
    assert_eq!(all["current_page"], 1);
    assert_eq!(all["total_pages"], 1);
    let titles: Vec<&str> = all["books"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Dune", "Emma", "Hyperion", "Neuromancer"]);

    let (_, filtered) = app
        .call(
            "GET",
            "/api/v1/books?genre=Science%20Fiction&minPrice=900&maxPrice=1200",
            None,
            None,
        )
        .await;
    assert_eq!(filtered["total_books"], 2);
    assert_eq!(filtered["books"][0]["title"], "Dune");
    assert_eq!(filtered["books"][1]["title"], "Neuromancer");

    let (_, second) = app
        .call("GET", "/api/v1/books?page=2&limit=3", None, None)
        .await;
    assert_eq!(second["total_books"], 4);
    assert_eq!(second["current_page"], 2);
    assert_eq!(second["total_pages"], 2);
    assert_eq!(second["books"].as_array().unwrap().len(), 1);
    assert_eq!(second["books"][0]["title"], "Neuromancer");

    let (_, searched) = app
        .call("GET", "/api/v1/books?search=hyper", None, None)
        .await;
    assert_eq!(searched["total_books"], 1);
    assert_eq!(searched["books"][0]["title"], "Hyperion");

    let (status, json) = app.call("GET", "/api/v1/books?page=0", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation_error");
}
