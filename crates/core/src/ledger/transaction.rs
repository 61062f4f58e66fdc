//! Immutable transaction log records.

use chrono::{DateTime, Utc};
use fleetpay_shared::types::{Amount, EntityId, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::balance::Balance;
use crate::ledger::error::LedgerError;
use crate::ledger::types::{TransactionFilter, TransactionType};

/// Longest accepted transaction description.
pub const MAX_DESCRIPTION_LEN: usize = 255;

/// Longest accepted external reference; matches `reference_id VARCHAR(128)`.
pub const MAX_REFERENCE_LEN: usize = 128;

/// An audit record of one balance-affecting event.
///
/// `amount` is the signed effect on the book balance and `balance_after` is
/// the book balance once the event is applied, so summing `amount` over an
/// entity's transactions in `sequence` order reproduces every
/// `balance_after`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Transaction ID.
    pub id: TransactionId,
    /// The entity whose balance changed.
    pub entity_id: EntityId,
    /// Position in the entity's log; equals the balance version it produced.
    pub sequence: i64,
    /// Transaction type.
    pub transaction_type: TransactionType,
    /// Signed effect on the book balance.
    pub amount: Decimal,
    /// Human-readable description.
    pub description: String,
    /// Optional link to an order or withdrawal request.
    pub reference_id: Option<String>,
    /// Book balance after this transaction.
    pub balance_after: Amount,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl LedgerTransaction {
    /// Records `magnitude` of `transaction_type` against the post-mutation balance.
    ///
    /// `after` must already carry the version this unit of work commits.
    pub fn record(
        after: &Balance,
        transaction_type: TransactionType,
        magnitude: Amount,
        description: impl Into<String>,
        reference_id: Option<String>,
    ) -> Result<Self, LedgerError> {
        Ok(Self {
            id: TransactionId::new(),
            entity_id: after.entity_id,
            sequence: after.version,
            transaction_type,
            amount: transaction_type.signed(magnitude),
            description: description.into(),
            reference_id,
            balance_after: after.book_balance()?,
            created_at: after.updated_at,
        })
    }

    /// Returns the unsigned magnitude of the transaction.
    #[must_use]
    pub fn magnitude(&self) -> Decimal {
        self.amount.abs()
    }

    /// Returns true if the transaction passes `filter`.
    #[must_use]
    pub fn matches(&self, filter: &TransactionFilter) -> bool {
        filter
            .transaction_type
            .is_none_or(|wanted| wanted == self.transaction_type)
            && filter.period.contains(self.created_at)
    }
}
