//! FleetPay earnings ledger server.
//!
//! Main entry point for the ledger HTTP service.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fleetpay_api::{AppState, create_router};
use fleetpay_core::EarningsLedger;
use fleetpay_db::{PgLedgerStore, connect};
use fleetpay_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleetpay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load()?;

    // Connect to database
    let db = connect(&config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    // Build the ledger over PostgreSQL
    let store = Arc::new(PgLedgerStore::new(db));
    let ledger = EarningsLedger::from_config(store, &config.ledger)?;
    info!(
        lock_timeout_ms = config.ledger.lock_timeout_ms,
        unit_timeout_ms = config.ledger.unit_timeout_ms,
        max_retries = config.ledger.max_retries,
        "Earnings ledger configured"
    );

    // Create router
    let app = create_router(AppState::new(ledger));

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
