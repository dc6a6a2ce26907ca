//! HTTP API server for the storefront cart-to-order core.
//!
//! Exposes the cart and checkout operations over REST, with structured
//! logging (tracing) and Prometheus metrics. Authentication is consumed,
//! not implemented: the upstream auth layer injects the resolved user id
//! (see [`auth::CurrentUser`]).

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use cart_store::{CatalogReader, StorefrontStore};
use domain::{CartService, CheckoutService};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: StorefrontStore, C: CatalogReader> {
    pub cart: CartService<S, C>,
    pub checkout: CheckoutService<S>,
    pub catalog: C,
}

/// Wires the services over a store and catalog into shared state.
pub fn create_state<S, C>(store: S, catalog: C) -> Arc<AppState<S, C>>
where
    S: StorefrontStore + Clone,
    C: CatalogReader + Clone,
{
    Arc::new(AppState {
        cart: CartService::new(store.clone(), catalog.clone()),
        checkout: CheckoutService::new(store),
        catalog,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, C>(state: Arc<AppState<S, C>>, metrics_handle: PrometheusHandle) -> Router
where
    S: StorefrontStore + 'static,
    C: CatalogReader + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/products", get(routes::products::list::<S, C>))
        .route("/products/{id}", get(routes::products::get::<S, C>))
        .route("/cart", get(routes::cart::get::<S, C>))
        .route("/cart/items", post(routes::cart::add_item::<S, C>))
        .route("/cart/items/{id}", put(routes::cart::update_item::<S, C>))
        .route(
            "/orders",
            post(routes::orders::place::<S, C>).get(routes::orders::list::<S, C>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S, C>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
