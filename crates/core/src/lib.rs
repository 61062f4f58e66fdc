//! Core business logic for FleetPay.
//!
//! This crate contains the earnings ledger with ZERO web or database
//! dependencies. Storage is reached only through the `LedgerStore` trait.
//!
//! # Modules
//!
//! - `ledger` - Balances, the transaction log and reconciliation
//! - `commission` - Commission computation for delivered orders
//! - `withdrawal` - Withdrawal request state machine
//! - `settlement` - Per-entity serialization and the `EarningsLedger` facade

pub mod commission;
pub mod ledger;
pub mod settlement;
pub mod withdrawal;

pub use ledger::LedgerError;
pub use settlement::{EarningsLedger, InMemoryLedgerStore, LedgerStore};
