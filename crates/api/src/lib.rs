//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - Entity, event and withdrawal routes over `EarningsLedger`
//! - Uniform `{ error, message }` error responses
//! - The application router with tracing and CORS layers

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use fleetpay_core::EarningsLedger;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The earnings ledger every route goes through.
    pub ledger: Arc<EarningsLedger>,
}

impl AppState {
    /// Creates state around a ledger.
    #[must_use]
    pub fn new(ledger: EarningsLedger) -> Self {
        Self {
            ledger: Arc::new(ledger),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
