//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::AppResult;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger tuning and commission defaults.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Settlement and commission settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// How long a unit of work waits for its entity lock.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Upper bound on a single unit of work once the lock is held.
    #[serde(default = "default_unit_timeout_ms")]
    pub unit_timeout_ms: u64,
    /// Retries after a concurrency conflict before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff between retries, doubled on each attempt.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Driver share of the order total, in percent.
    #[serde(default = "default_driver_rate")]
    pub default_driver_rate: Decimal,
    /// Platform fee taken from restaurant revenue, in percent.
    #[serde(default = "default_restaurant_rate")]
    pub default_restaurant_rate: Decimal,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            unit_timeout_ms: default_unit_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            default_driver_rate: default_driver_rate(),
            default_restaurant_rate: default_restaurant_rate(),
        }
    }
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_unit_timeout_ms() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    50
}

fn default_driver_rate() -> Decimal {
    Decimal::from(70)
}

fn default_restaurant_rate() -> Decimal {
    Decimal::from(10)
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> AppResult<Self> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("FLEETPAY").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ledger_defaults() {
        let ledger = LedgerConfig::default();
        assert_eq!(ledger.lock_timeout_ms, 5_000);
        assert_eq!(ledger.max_retries, 3);
        assert_eq!(ledger.default_driver_rate, dec!(70));
        assert_eq!(ledger.default_restaurant_rate, dec!(10));
    }

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("FLEETPAY__DATABASE__URL", Some("postgres://localhost/fleetpay_test")),
                ("RUN_MODE", Some("test")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/fleetpay_test");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.server.port, 8080);
                assert_eq!(config.ledger.retry_backoff_ms, 50);
            },
        );
    }

    #[test]
    fn test_load_requires_database_url() {
        temp_env::with_vars(
            [
                ("FLEETPAY__DATABASE__URL", None::<&str>),
                ("RUN_MODE", Some("test")),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }
}
