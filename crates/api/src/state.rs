//! Shared application state.

use checkout::{CartService, CatalogService, CheckoutConfig, CheckoutCoordinator};
use reviews::{ReviewConfig, ReviewService};
use store::Store;

/// Services shared by every handler, all backed by one store.
pub struct AppState<S: Store + Clone> {
    pub checkout: CheckoutCoordinator<S>,
    pub carts: CartService<S>,
    pub catalog: CatalogService<S>,
    pub reviews: ReviewService<S>,
}

impl<S: Store + Clone> AppState<S> {
    /// Wires every service to `store` with the given policies.
    pub fn new(store: S, checkout_config: CheckoutConfig, review_config: ReviewConfig) -> Self {
        Self {
            checkout: CheckoutCoordinator::new(store.clone(), checkout_config),
            carts: CartService::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            reviews: ReviewService::new(store, review_config),
        }
    }
}
