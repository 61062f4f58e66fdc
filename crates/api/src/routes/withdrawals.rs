//! Withdrawal routes: requests from entities and the admin review queue.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use fleetpay_core::withdrawal::{NewWithdrawal, PaymentMethod, WithdrawalFilter, WithdrawalStatus};
use fleetpay_shared::types::{EntityId, UserId, WithdrawalId};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::entities::page_request;
use crate::AppState;
use crate::error::{bad_request, ledger_error_response};

/// Creates the withdrawal routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/entities/{entity_id}/withdrawals", post(create_withdrawal))
        .route("/entities/{entity_id}/withdrawals/full", post(withdraw_full))
        .route("/withdrawals", get(list_withdrawals))
        .route("/withdrawals/{withdrawal_id}", get(get_withdrawal))
        .route("/withdrawals/{withdrawal_id}/approve", post(approve_withdrawal))
        .route("/withdrawals/{withdrawal_id}/reject", post(reject_withdrawal))
        .route("/withdrawals/{withdrawal_id}/process", post(mark_processed))
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for a withdrawal of a fixed amount.
#[derive(Debug, Deserialize)]
pub struct CreateWithdrawalRequest {
    /// Amount to reserve.
    pub amount: Decimal,
    /// Payout channel.
    pub payment_method: PaymentMethod,
    /// Payout details; required for bank transfers.
    #[serde(default)]
    pub account_details: serde_json::Value,
    /// Optional note from the requester.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request body for approving a withdrawal.
#[derive(Debug, Deserialize)]
pub struct ApproveWithdrawalRequest {
    /// Reviewer.
    pub approved_by: Uuid,
    /// Optional notes.
    pub admin_notes: Option<String>,
}

/// Request body for rejecting a withdrawal.
#[derive(Debug, Deserialize)]
pub struct RejectWithdrawalRequest {
    /// Why the request was rejected.
    pub reason: String,
}

/// Query parameters for listing withdrawals.
#[derive(Debug, Default, Deserialize)]
pub struct ListWithdrawalsQuery {
    /// Filter by status (pending, approved, rejected, processed).
    pub status: Option<String>,
    /// Filter by entity.
    pub entity_id: Option<Uuid>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size (default: 20, max: 100).
    pub per_page: Option<u32>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/entities/{entity_id}/withdrawals` - Request a withdrawal.
async fn create_withdrawal(
    State(state): State<AppState>,
    Path(entity_id): Path<Uuid>,
    Json(payload): Json<CreateWithdrawalRequest>,
) -> Response {
    let new = NewWithdrawal {
        payment_method: payload.payment_method,
        account_details: payload.account_details,
        notes: payload.notes,
    };
    match state
        .ledger
        .create_withdrawal(EntityId::from_uuid(entity_id), payload.amount, new)
        .await
    {
        Ok(request) => (StatusCode::CREATED, Json(request)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/entities/{entity_id}/withdrawals/full` - Withdraw the whole available balance.
async fn withdraw_full(
    State(state): State<AppState>,
    Path(entity_id): Path<Uuid>,
    Json(payload): Json<NewWithdrawal>,
) -> Response {
    match state
        .ledger
        .withdraw_full(EntityId::from_uuid(entity_id), payload)
        .await
    {
        Ok(request) => (StatusCode::CREATED, Json(request)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/withdrawals` - Withdrawal requests, newest first.
///
/// `?status=pending` is the admin review queue.
async fn list_withdrawals(
    State(state): State<AppState>,
    Query(query): Query<ListWithdrawalsQuery>,
) -> Response {
    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => match WithdrawalStatus::parse(raw) {
            Some(parsed) => Some(parsed),
            None => return bad_request(format!("Unknown withdrawal status: {raw}")),
        },
    };
    let filter = WithdrawalFilter {
        entity_id: query.entity_id.map(EntityId::from_uuid),
        status,
    };

    match state
        .ledger
        .list_withdrawals(filter, page_request(query.page, query.per_page))
        .await
    {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/withdrawals/{withdrawal_id}` - A single request.
async fn get_withdrawal(
    State(state): State<AppState>,
    Path(withdrawal_id): Path<Uuid>,
) -> Response {
    match state.ledger.withdrawal(WithdrawalId::from_uuid(withdrawal_id)).await {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/withdrawals/{withdrawal_id}/approve` - Settle the reservation.
async fn approve_withdrawal(
    State(state): State<AppState>,
    Path(withdrawal_id): Path<Uuid>,
    Json(payload): Json<ApproveWithdrawalRequest>,
) -> Response {
    match state
        .ledger
        .approve_withdrawal(
            WithdrawalId::from_uuid(withdrawal_id),
            UserId::from_uuid(payload.approved_by),
            payload.admin_notes,
        )
        .await
    {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/withdrawals/{withdrawal_id}/reject` - Release the reservation.
async fn reject_withdrawal(
    State(state): State<AppState>,
    Path(withdrawal_id): Path<Uuid>,
    Json(payload): Json<RejectWithdrawalRequest>,
) -> Response {
    match state
        .ledger
        .reject_withdrawal(WithdrawalId::from_uuid(withdrawal_id), payload.reason)
        .await
    {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/withdrawals/{withdrawal_id}/process` - Confirm external payout.
async fn mark_processed(
    State(state): State<AppState>,
    Path(withdrawal_id): Path<Uuid>,
) -> Response {
    match state
        .ledger
        .mark_processed(WithdrawalId::from_uuid(withdrawal_id))
        .await
    {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}
