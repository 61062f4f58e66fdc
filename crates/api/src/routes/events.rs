//! Inbound events from the order service.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use fleetpay_core::commission::{CommissionOutcome, OrderDelivered};

use crate::AppState;
use crate::error::ledger_error_response;

/// Creates the event routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/events/order-delivered", post(order_delivered))
}

/// POST `/events/order-delivered` - Apply the commission for a delivered order.
///
/// Safe to redeliver: the first delivery answers 201, every replay 200 with
/// the original commission.
async fn order_delivered(
    State(state): State<AppState>,
    Json(event): Json<OrderDelivered>,
) -> Response {
    match state.ledger.apply_commission(event).await {
        Ok(outcome @ CommissionOutcome::Applied(_)) => {
            (StatusCode::CREATED, Json(outcome)).into_response()
        }
        Ok(outcome @ CommissionOutcome::AlreadyProcessed(_)) => {
            (StatusCode::OK, Json(outcome)).into_response()
        }
        Err(e) => ledger_error_response(&e),
    }
}
