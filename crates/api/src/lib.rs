//! HTTP API server with observability for the bookstore backend.
//!
//! Provides REST endpoints for the catalog, carts, orders and reviews,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod identity;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    let api = Router::new()
        .route(
            "/orders",
            post(routes::orders::place::<S>).get(routes::orders::list::<S>),
        )
        .route("/orders/{id}/cancel", patch(routes::orders::cancel::<S>))
        .route(
            "/cart",
            get(routes::cart::get::<S>).post(routes::cart::add::<S>),
        )
        .route("/cart/{book_id}", delete(routes::cart::remove::<S>))
        .route(
            "/books",
            post(routes::books::create::<S>).get(routes::books::list::<S>),
        )
        .route(
            "/books/{id}",
            get(routes::books::get::<S>).put(routes::books::update::<S>),
        )
        .route(
            "/books/{book_id}/reviews",
            get(routes::reviews::list::<S>).post(routes::reviews::submit::<S>),
        )
        .with_state(state);

    Router::new()
        .route("/health", get(routes::health::check))
        .nest("/api/v1", api)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state with policies taken from `config`.
pub fn create_default_state<S: Store + Clone + 'static>(
    store: S,
    config: &Config,
) -> Arc<AppState<S>> {
    Arc::new(AppState::new(
        store,
        config.checkout_config(),
        config.review_config(),
    ))
}

/// Registers descriptions for the metrics emitted by the services.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "checkout_orders_placed_total",
        "Orders committed by the checkout coordinator"
    );
    metrics::describe_counter!(
        "checkout_failures_total",
        "Checkouts rolled back, labelled by reason"
    );
    metrics::describe_histogram!(
        "checkout_duration_seconds",
        metrics::Unit::Seconds,
        "Wall time of a checkout transaction"
    );
    metrics::describe_counter!("orders_cancelled_total", "Orders moved to CANCELLED");
    metrics::describe_counter!("reviews_submitted_total", "Reviews accepted");
    metrics::describe_counter!(
        "rating_recomputations_total",
        "Average rating recomputations"
    );
}
