//! Rendering of ledger errors as HTTP responses.
//!
//! Every error body has the shape `{ "error": <code>, "message": <text> }`.

use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use fleetpay_core::LedgerError;
use serde_json::json;
use tracing::{error, warn};

/// Converts a ledger error into its HTTP response.
///
/// Storage failures are logged and answered with a generic message so that
/// database details never reach the caller.
pub fn ledger_error_response(err: &LedgerError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let message = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
        error!(error = %err, code = err.error_code(), "Ledger operation failed");
        "An internal error occurred".to_string()
    } else {
        if err.is_retryable() {
            warn!(error = %err, code = err.error_code(), "Ledger operation contended");
        }
        err.to_string()
    };

    (
        status,
        Json(json!({
            "error": err.error_code(),
            "message": message
        })),
    )
        .into_response()
}

/// A 400 response for malformed query or path input.
pub fn bad_request(message: impl Into<String>) -> Response {
    ledger_error_response(&LedgerError::InvalidInput(message.into()))
}
