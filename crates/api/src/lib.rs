//! HTTP adapter for the order saga system.
//!
//! Exposes the order lifecycle, payment, shipment, and saga operations as
//! REST endpoints, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{OrderSagaOrchestrator, Services};
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub store: S,
    pub saga: OrderSagaOrchestrator<S>,
}

impl<S: Store + Clone + 'static> AppState<S> {
    pub fn new(store: S) -> Arc<Self> {
        Arc::new(Self {
            saga: OrderSagaOrchestrator::new(store.clone()),
            store,
        })
    }

    pub fn services(&self) -> &Services<S> {
        self.saga.services()
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/items", post(routes::items::create::<S>))
        .route("/items/{id}", get(routes::items::get::<S>))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/pay", post(routes::orders::pay::<S>))
        .route("/orders/{id}/ship", post(routes::orders::ship::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route("/orders/{id}/payments", get(routes::orders::payments::<S>))
        .route("/orders/{id}/shipments", get(routes::orders::shipments::<S>))
        .route("/payments", post(routes::payments::create::<S>))
        .route("/payments/{id}", get(routes::payments::get::<S>))
        .route("/payments/{id}/complete", post(routes::payments::complete::<S>))
        .route("/payments/{id}/fail", post(routes::payments::fail::<S>))
        .route("/payments/{id}/cancel", post(routes::payments::cancel::<S>))
        .route("/shipments", post(routes::shipments::create::<S>))
        .route("/shipments/{id}", get(routes::shipments::get::<S>))
        .route("/shipments/{id}/ship", post(routes::shipments::ship::<S>))
        .route("/shipments/{id}/complete", post(routes::shipments::complete::<S>))
        .route("/shipments/{id}/cancel", post(routes::shipments::cancel::<S>))
        .route("/sagas/orders", post(routes::sagas::run::<S>))
        .route("/compensations", post(routes::sagas::compensate::<S>))
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
