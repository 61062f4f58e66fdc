//! Storage contract for the earnings ledger.
//!
//! A unit of work reads through the store, computes its outcome in memory and
//! hands it back as one `Changeset`. `commit` must apply the changeset
//! atomically: either the balance, the transaction, the commission and the
//! withdrawal request are all persisted, or none is.

use async_trait::async_trait;
use fleetpay_shared::types::{EntityId, PageRequest, PageResponse, Rate, WithdrawalId};

use crate::commission::types::{Commission, CommissionTotals};
use crate::ledger::balance::Balance;
use crate::ledger::error::LedgerError;
use crate::ledger::transaction::LedgerTransaction;
use crate::ledger::types::{DateRange, TransactionFilter};
use crate::withdrawal::types::{WithdrawalFilter, WithdrawalRequest};

/// Everything one unit of work writes.
#[derive(Debug, Clone, PartialEq)]
pub struct Changeset {
    /// Version the balance had when the unit of work read it.
    pub expected_version: i64,
    /// Post-mutation balance, carrying `expected_version + 1`.
    pub balance: Balance,
    /// Transaction to append, if the unit affects the book balance.
    pub transaction: Option<LedgerTransaction>,
    /// Commission to insert.
    pub commission: Option<Commission>,
    /// Withdrawal request to insert or update.
    pub withdrawal: Option<WithdrawalRequest>,
}

impl Changeset {
    /// Starts a changeset moving `before` to `after`.
    ///
    /// `after` must come from `before` through `Balance::next_version`.
    #[must_use]
    pub fn new(before: &Balance, after: Balance) -> Self {
        Self {
            expected_version: before.version,
            balance: after,
            transaction: None,
            commission: None,
            withdrawal: None,
        }
    }

    /// Adds the transaction record.
    #[must_use]
    pub fn with_transaction(mut self, transaction: LedgerTransaction) -> Self {
        self.transaction = Some(transaction);
        self
    }

    /// Adds the commission record.
    #[must_use]
    pub fn with_commission(mut self, commission: Commission) -> Self {
        self.commission = Some(commission);
        self
    }

    /// Adds the withdrawal request.
    #[must_use]
    pub fn with_withdrawal(mut self, withdrawal: WithdrawalRequest) -> Self {
        self.withdrawal = Some(withdrawal);
        self
    }
}

/// An entity's balance, full log and open reservations, read at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSnapshot {
    /// Stored balance.
    pub balance: Balance,
    /// Every transaction, oldest first.
    pub transactions: Vec<LedgerTransaction>,
    /// Withdrawal requests still pending.
    pub pending_withdrawals: Vec<WithdrawalRequest>,
}

/// Persistence for balances, transactions, commissions and withdrawals.
///
/// Implementations report a stale `expected_version` or a duplicate
/// `(entity_id, order_id)` commission as `LedgerError::ConcurrencyConflict`.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Inserts a freshly opened balance.
    ///
    /// Fails with `EntityAlreadyExists` if the entity already has one.
    async fn create_balance(&self, balance: &Balance) -> Result<(), LedgerError>;

    /// Loads the current balance of an entity.
    async fn load_balance(&self, entity_id: EntityId) -> Result<Option<Balance>, LedgerError>;

    /// Finds the commission recorded for an order.
    async fn find_commission(
        &self,
        entity_id: EntityId,
        order_id: &str,
    ) -> Result<Option<Commission>, LedgerError>;

    /// Finds a withdrawal request.
    async fn find_withdrawal(
        &self,
        id: WithdrawalId,
    ) -> Result<Option<WithdrawalRequest>, LedgerError>;

    /// Applies a changeset atomically.
    async fn commit(&self, changeset: Changeset) -> Result<(), LedgerError>;

    /// Lists an entity's transactions, newest first.
    async fn list_transactions(
        &self,
        entity_id: EntityId,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<PageResponse<LedgerTransaction>, LedgerError>;

    /// Reads the balance, the whole log and the pending withdrawals of an
    /// entity in one consistent view. No commit may land between the reads.
    async fn ledger_snapshot(
        &self,
        entity_id: EntityId,
    ) -> Result<Option<LedgerSnapshot>, LedgerError>;

    /// Lists an entity's commissions, newest first.
    async fn list_commissions(
        &self,
        entity_id: EntityId,
        period: &DateRange,
        page: PageRequest,
    ) -> Result<PageResponse<Commission>, LedgerError>;

    /// Sums an entity's commissions in a window.
    async fn commission_totals(
        &self,
        entity_id: EntityId,
        period: &DateRange,
    ) -> Result<CommissionTotals, LedgerError>;

    /// Lists withdrawal requests, newest first.
    async fn list_withdrawals(
        &self,
        filter: &WithdrawalFilter,
        page: PageRequest,
    ) -> Result<PageResponse<WithdrawalRequest>, LedgerError>;

    /// Stores or clears an entity's commission rate override.
    async fn set_commission_rate(
        &self,
        entity_id: EntityId,
        rate: Option<Rate>,
    ) -> Result<(), LedgerError>;

    /// Loads an entity's commission rate override.
    async fn commission_rate(&self, entity_id: EntityId) -> Result<Option<Rate>, LedgerError>;
}
