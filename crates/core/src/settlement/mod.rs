//! Settlement layer.
//!
//! Ties the pure ledger, commission and withdrawal logic to storage:
//! - `store` - The atomic storage contract (`LedgerStore`, `Changeset`, `LedgerSnapshot`)
//! - `memory` - In-memory store used by tests and local runs
//! - `coordinator` - Per-entity locking, timeouts and retries
//! - `service` - The `EarningsLedger` facade every caller goes through

pub mod coordinator;
pub mod memory;
pub mod service;
pub mod store;

pub use coordinator::{RetryPolicy, SettlementCoordinator};
pub use memory::InMemoryLedgerStore;
pub use service::{EarningsLedger, EarningsSummary, ManualPosting, Posting};
pub use store::{Changeset, LedgerSnapshot, LedgerStore};
