//! Entity ledger routes: onboarding, balances, manual postings, rate
//! settings and the read-only reporting views.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{DateTime, Utc};
use fleetpay_core::ledger::{DateRange, EntityKind, TransactionFilter, TransactionType};
use fleetpay_core::settlement::ManualPosting;
use fleetpay_shared::types::{EntityId, PageRequest};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use crate::error::{bad_request, ledger_error_response};

/// Creates the entity routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/entities", post(open_account))
        .route("/entities/{entity_id}/balance", get(get_balance))
        .route("/entities/{entity_id}/credit", post(credit))
        .route("/entities/{entity_id}/debit", post(debit))
        .route("/entities/{entity_id}/commission-rate", put(set_commission_rate))
        .route("/entities/{entity_id}/transactions", get(list_transactions))
        .route("/entities/{entity_id}/commissions", get(list_commissions))
        .route("/entities/{entity_id}/earnings", get(earnings_summary))
        .route("/entities/{entity_id}/reconciliation", get(reconcile))
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for onboarding an entity.
#[derive(Debug, Deserialize)]
pub struct OpenAccountRequest {
    /// Entity ID issued by the entity service.
    pub entity_id: Uuid,
    /// Driver or restaurant.
    pub kind: EntityKind,
}

/// Request body for a manual credit or debit.
#[derive(Debug, Deserialize)]
pub struct PostingRequest {
    /// Transaction type.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Positive amount.
    pub amount: Decimal,
    /// Description.
    pub description: String,
    /// Optional external reference.
    pub reference_id: Option<String>,
}

impl From<PostingRequest> for ManualPosting {
    fn from(request: PostingRequest) -> Self {
        Self {
            transaction_type: request.transaction_type,
            amount: request.amount,
            description: request.description,
            reference_id: request.reference_id,
        }
    }
}

/// Request body for setting a commission rate override.
#[derive(Debug, Deserialize)]
pub struct CommissionRateRequest {
    /// Percentage in `[0, 100]`; `null` clears the override.
    pub rate: Option<Decimal>,
}

/// Time window and paging shared by the reporting endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    /// Window start (RFC 3339).
    pub from: Option<DateTime<Utc>>,
    /// Window end (RFC 3339).
    pub to: Option<DateTime<Utc>>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size (default: 20, max: 100).
    pub per_page: Option<u32>,
}

impl PeriodQuery {
    fn period(&self) -> DateRange {
        DateRange::new(self.from, self.to)
    }

    fn page(&self) -> PageRequest {
        page_request(self.page, self.per_page)
    }
}

/// Query parameters for listing transactions.
#[derive(Debug, Default, Deserialize)]
pub struct ListTransactionsQuery {
    /// Filter by transaction type.
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// Window start (RFC 3339).
    pub from: Option<DateTime<Utc>>,
    /// Window end (RFC 3339).
    pub to: Option<DateTime<Utc>>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size (default: 20, max: 100).
    pub per_page: Option<u32>,
}

/// Builds a page request, falling back to the default for missing values.
pub(crate) fn page_request(page: Option<u32>, per_page: Option<u32>) -> PageRequest {
    let defaults = PageRequest::default();
    PageRequest::new(
        page.unwrap_or(defaults.page),
        per_page.unwrap_or(defaults.per_page),
    )
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/entities` - Open the ledger of a newly onboarded entity.
async fn open_account(
    State(state): State<AppState>,
    Json(payload): Json<OpenAccountRequest>,
) -> Response {
    match state
        .ledger
        .open_account(EntityId::from_uuid(payload.entity_id), payload.kind)
        .await
    {
        Ok(balance) => (StatusCode::CREATED, Json(balance)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/entities/{entity_id}/balance` - Current balance snapshot.
async fn get_balance(State(state): State<AppState>, Path(entity_id): Path<Uuid>) -> Response {
    match state.ledger.balance(EntityId::from_uuid(entity_id)).await {
        Ok(balance) => (StatusCode::OK, Json(balance)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/entities/{entity_id}/credit` - Manual credit (manual_add, bonus, refund).
async fn credit(
    State(state): State<AppState>,
    Path(entity_id): Path<Uuid>,
    Json(payload): Json<PostingRequest>,
) -> Response {
    match state
        .ledger
        .credit(EntityId::from_uuid(entity_id), payload.into())
        .await
    {
        Ok(posting) => (StatusCode::CREATED, Json(posting)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// POST `/entities/{entity_id}/debit` - Manual debit (deduction, adjustment).
async fn debit(
    State(state): State<AppState>,
    Path(entity_id): Path<Uuid>,
    Json(payload): Json<PostingRequest>,
) -> Response {
    match state
        .ledger
        .debit(EntityId::from_uuid(entity_id), payload.into())
        .await
    {
        Ok(posting) => (StatusCode::CREATED, Json(posting)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// PUT `/entities/{entity_id}/commission-rate` - Set or clear the rate override.
async fn set_commission_rate(
    State(state): State<AppState>,
    Path(entity_id): Path<Uuid>,
    Json(payload): Json<CommissionRateRequest>,
) -> Response {
    match state
        .ledger
        .set_commission_rate(EntityId::from_uuid(entity_id), payload.rate)
        .await
    {
        Ok(effective) => (
            StatusCode::OK,
            Json(json!({
                "entity_id": entity_id,
                "override": payload.rate,
                "effective_rate": effective
            })),
        )
            .into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/entities/{entity_id}/transactions` - Transaction log, newest first.
async fn list_transactions(
    State(state): State<AppState>,
    Path(entity_id): Path<Uuid>,
    Query(query): Query<ListTransactionsQuery>,
) -> Response {
    let transaction_type = match query.transaction_type.as_deref() {
        None => None,
        Some(raw) => match TransactionType::parse(raw) {
            Some(parsed) => Some(parsed),
            None => return bad_request(format!("Unknown transaction type: {raw}")),
        },
    };
    let filter = TransactionFilter {
        transaction_type,
        period: DateRange::new(query.from, query.to),
    };
    let page = page_request(query.page, query.per_page);

    match state
        .ledger
        .list_transactions(EntityId::from_uuid(entity_id), filter, page)
        .await
    {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/entities/{entity_id}/commissions` - Commission history, newest first.
async fn list_commissions(
    State(state): State<AppState>,
    Path(entity_id): Path<Uuid>,
    Query(query): Query<PeriodQuery>,
) -> Response {
    match state
        .ledger
        .list_commissions(EntityId::from_uuid(entity_id), query.period(), query.page())
        .await
    {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/entities/{entity_id}/earnings` - Commission earnings over a window.
async fn earnings_summary(
    State(state): State<AppState>,
    Path(entity_id): Path<Uuid>,
    Query(query): Query<PeriodQuery>,
) -> Response {
    match state
        .ledger
        .earnings_summary(EntityId::from_uuid(entity_id), query.period())
        .await
    {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/entities/{entity_id}/reconciliation` - Replay check of the stored balance.
async fn reconcile(State(state): State<AppState>, Path(entity_id): Path<Uuid>) -> Response {
    match state.ledger.reconcile(EntityId::from_uuid(entity_id)).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}
