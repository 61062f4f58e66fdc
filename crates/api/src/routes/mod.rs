//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod entities;
pub mod events;
pub mod health;
pub mod withdrawals;

#[cfg(test)]
mod tests;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(entities::routes())
        .merge(events::routes())
        .merge(withdrawals::routes())
}
