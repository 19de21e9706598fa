//! HTTP API server for the basket reservation service.
//!
//! Exposes the basket, checkout, contact, partner and catalog endpoints,
//! with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod demo;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use catalog_store::CatalogStore;
use domain::EventPublisher;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: CatalogStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health::<S>))
        .route("/products", get(routes::products::list::<S>))
        .route(
            "/basket",
            get(routes::basket::get::<S>)
                .post(routes::basket::add::<S>)
                .put(routes::basket::update::<S>)
                .delete(routes::basket::remove::<S>),
        )
        .route(
            "/order",
            get(routes::orders::list::<S>).post(routes::orders::checkout::<S>),
        )
        .route(
            "/contact",
            get(routes::contacts::list::<S>).post(routes::contacts::create::<S>),
        )
        .route("/partner/orders", get(routes::partner::orders::<S>))
        .route(
            "/partner/state",
            get(routes::partner::get_state::<S>).post(routes::partner::set_state::<S>),
        )
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

/// Creates the application state over `store`, publishing checkout events
/// to `publisher`.
pub fn create_state<S: CatalogStore + Clone + 'static>(
    store: S,
    publisher: Arc<dyn EventPublisher>,
) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store, publisher))
}
