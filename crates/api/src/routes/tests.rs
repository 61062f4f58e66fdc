use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use fleetpay_core::{EarningsLedger, InMemoryLedgerStore};
use fleetpay_shared::LedgerConfig;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use crate::{AppState, create_router};

fn app() -> Router {
    let store = Arc::new(InMemoryLedgerStore::new());
    let ledger = EarningsLedger::from_config(store, &LedgerConfig::default()).unwrap();
    create_router(AppState::new(ledger))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

async fn open_driver(app: &Router) -> Uuid {
    let entity_id = Uuid::new_v4();
    let (status, _) = send(
        app,
        "POST",
        "/api/v1/entities",
        Some(json!({"entity_id": entity_id, "kind": "driver"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    entity_id
}

async fn deliver(app: &Router, entity_id: Uuid, order_id: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/v1/events/order-delivered",
        Some(json!({
            "entity_id": entity_id,
            "order_id": order_id,
            "order_amount": "1000",
            "commission_rate": "70"
        })),
    )
    .await
}

#[tokio::test]
async fn test_health_check() {
    let (status, body) = send(&app(), "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_order_delivered_is_idempotent() {
    let app = app();
    let entity_id = open_driver(&app).await;

    let (status, body) = deliver(&app, entity_id, "order-1").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["outcome"], "applied");
    assert_eq!(decimal(&body["commission"]["credited_amount"]), dec!(700));

    let (status, body) = deliver(&app, entity_id, "order-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "already_processed");

    let (_, balance) = send(&app, "GET", &format!("/api/v1/entities/{entity_id}/balance"), None).await;
    assert_eq!(decimal(&balance["available_balance"]), dec!(700));
}

#[tokio::test]
async fn test_withdrawal_lifecycle() {
    let app = app();
    let entity_id = open_driver(&app).await;
    deliver(&app, entity_id, "order-1").await;

    let (status, request) = send(
        &app,
        "POST",
        &format!("/api/v1/entities/{entity_id}/withdrawals"),
        Some(json!({
            "amount": "500",
            "payment_method": "bank_transfer",
            "account_details": {"bank_name": "First Bank", "account_number": "0123456789"},
            "notes": "end of week"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["status"], "pending");
    assert_eq!(request["notes"], "end of week");
    let withdrawal_id = request["id"].as_str().unwrap().to_string();

    let (status, queue) = send(&app, "GET", "/api/v1/withdrawals?status=pending", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue["meta"]["total"], 1);

    let (status, approved) = send(
        &app,
        "POST",
        &format!("/api/v1/withdrawals/{withdrawal_id}/approve"),
        Some(json!({"approved_by": Uuid::new_v4(), "admin_notes": "ok"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/withdrawals/{withdrawal_id}/reject"),
        Some(json!({"reason": "late"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, balance) = send(&app, "GET", &format!("/api/v1/entities/{entity_id}/balance"), None).await;
    assert_eq!(decimal(&balance["available_balance"]), dec!(200));
    assert_eq!(decimal(&balance["withdrawn_amount"]), dec!(500));

    let (status, page) = send(
        &app,
        "GET",
        &format!("/api/v1/entities/{entity_id}/transactions?type=withdrawal"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["meta"]["total"], 1);
    assert_eq!(decimal(&page["data"][0]["amount"]), dec!(-500));

    let (status, processed) = send(
        &app,
        "POST",
        &format!("/api/v1/withdrawals/{withdrawal_id}/process"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(processed["status"], "processed");

    let (_, report) = send(
        &app,
        "GET",
        &format!("/api/v1/entities/{entity_id}/reconciliation"),
        None,
    )
    .await;
    assert_eq!(report["is_consistent"], true);
}

#[tokio::test]
async fn test_domain_errors_render_code_and_status() {
    let app = app();
    let entity_id = open_driver(&app).await;
    deliver(&app, entity_id, "order-1").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/entities/{entity_id}/withdrawals"),
        Some(json!({"amount": "1000", "payment_method": "cash"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "INSUFFICIENT_BALANCE");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/entities/{}/balance", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "ENTITY_NOT_FOUND");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/entities",
        Some(json!({"entity_id": entity_id, "kind": "driver"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "ENTITY_ALREADY_EXISTS");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/events/order-delivered",
        Some(json!({"entity_id": entity_id, "order_id": "o-2", "order_amount": "-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_AMOUNT");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/entities/{entity_id}/transactions?type=tip"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_manual_postings_and_rate_override() {
    let app = app();
    let entity_id = open_driver(&app).await;

    let (status, posting) = send(
        &app,
        "POST",
        &format!("/api/v1/entities/{entity_id}/credit"),
        Some(json!({"type": "bonus", "amount": "25", "description": "weekend bonus"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(decimal(&posting["transaction"]["balance_after"]), dec!(25));

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/entities/{entity_id}/debit"),
        Some(json!({"type": "bonus", "amount": "5", "description": "wrong way"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_INPUT");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/entities/{entity_id}/commission-rate"),
        Some(json!({"rate": "15"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["effective_rate"]), dec!(15));

    let (_, outcome) = send(
        &app,
        "POST",
        "/api/v1/events/order-delivered",
        Some(json!({"entity_id": entity_id, "order_id": "o-9", "order_amount": "200"})),
    )
    .await;
    assert_eq!(decimal(&outcome["commission"]["credited_amount"]), dec!(30));

    let (status, summary) = send(
        &app,
        "GET",
        &format!("/api/v1/entities/{entity_id}/earnings"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["commission_count"], 1);
    assert_eq!(decimal(&summary["balance"]["available_balance"]), dec!(55));
}

#[tokio::test]
async fn test_oversized_input_is_rejected() {
    let app = app();
    let entity_id = open_driver(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/entities/{entity_id}/credit"),
        Some(json!({
            "type": "bonus",
            "amount": "25",
            "description": "bonus",
            "reference_id": "r".repeat(129)
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_INPUT");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/entities/{entity_id}/credit"),
        Some(json!({"type": "bonus", "amount": "25", "description": "d".repeat(256)})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_INPUT");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/events/order-delivered",
        Some(json!({
            "entity_id": entity_id,
            "order_id": "o-big",
            "order_amount": "79228162514264337593543950335"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_AMOUNT");

    let (_, balance) = send(&app, "GET", &format!("/api/v1/entities/{entity_id}/balance"), None).await;
    assert_eq!(decimal(&balance["total_earnings"]), dec!(0));
}
