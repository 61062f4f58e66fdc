//! Earnings ledger primitives.
//!
//! This module implements the per-entity balance and its transaction log:
//! - Balance snapshots and their credit/debit/reserve/settle/release mutations
//! - Immutable transaction records with signed effects
//! - Replay-based reconciliation
//! - The error taxonomy shared by every ledger operation

pub mod balance;
pub mod error;
pub mod reconcile;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod balance_props;

pub use balance::Balance;
pub use error::LedgerError;
pub use reconcile::{BalanceAfterMismatch, BalanceFigures, ReconciliationReport, reconcile};
pub use transaction::LedgerTransaction;
pub use types::{BalanceEffect, DateRange, EntityKind, TransactionFilter, TransactionType};
