//! Database migration runner for FleetPay.
//!
//! Usage:
//!   migrator up      - Run all pending migrations
//!   migrator down    - Rollback last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations
//!
//! The database is taken from the same configuration as the server
//! (`config/*.toml`, overridden by `FLEETPAY__DATABASE__URL`).

use anyhow::bail;
use sea_orm_migration::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fleetpay_db::connect;
use fleetpay_db::migration::Migrator;
use fleetpay_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleetpay=info,sea_orm_migration=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());
    let config = AppConfig::load()?;
    let db = connect(&config.database).await?;

    match command.as_str() {
        "up" => Migrator::up(&db, None).await?,
        "down" => Migrator::down(&db, Some(1)).await?,
        "status" => Migrator::status(&db).await?,
        "fresh" => Migrator::fresh(&db).await?,
        other => bail!("Unknown command `{other}`; expected up, down, status or fresh"),
    }
    info!(command = %command, "Migration command finished");

    Ok(())
}
