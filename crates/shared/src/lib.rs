//! Shared types, errors, and configuration for FleetPay.
//!
//! This crate provides common types used across all other crates:
//! - Amount and rate types with decimal precision
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Startup error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, LedgerConfig, ServerConfig};
pub use error::{AppError, AppResult};
