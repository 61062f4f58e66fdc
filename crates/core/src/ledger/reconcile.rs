//! Replay-based reconciliation of a stored balance against its log.

use fleetpay_shared::types::{Amount, EntityId, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::balance::Balance;
use crate::ledger::transaction::LedgerTransaction;
use crate::ledger::types::BalanceEffect;

/// Balance decomposition, signed so that a broken ledger can be reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceFigures {
    /// Total credits.
    pub total_earnings: Decimal,
    /// Total debits.
    pub total_deductions: Decimal,
    /// Total settled withdrawals and payouts.
    pub withdrawn_amount: Decimal,
    /// Open reservations.
    pub pending_withdrawal: Decimal,
    /// What remains available.
    pub available_balance: Decimal,
}

impl From<&Balance> for BalanceFigures {
    fn from(balance: &Balance) -> Self {
        Self {
            total_earnings: balance.total_earnings.value(),
            total_deductions: balance.total_deductions.value(),
            withdrawn_amount: balance.withdrawn_amount.value(),
            pending_withdrawal: balance.pending_withdrawal.value(),
            available_balance: balance.available_balance.value(),
        }
    }
}

/// A transaction whose `balance_after` disagrees with the replayed total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAfterMismatch {
    /// The offending transaction.
    pub transaction_id: TransactionId,
    /// What the transaction recorded.
    pub recorded: Decimal,
    /// What the replay computed at that point.
    pub expected: Decimal,
}

/// Result of reconciling one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// The entity checked.
    pub entity_id: EntityId,
    /// Figures held by the stored balance.
    pub stored: BalanceFigures,
    /// Figures derived from the transaction log and open reservations.
    pub derived: BalanceFigures,
    /// Number of transactions replayed.
    pub transaction_count: usize,
    /// Transactions whose snapshot does not match the replay.
    pub mismatches: Vec<BalanceAfterMismatch>,
    /// True when stored and derived figures agree and every snapshot matches.
    pub is_consistent: bool,
}

/// Replays `transactions` (oldest first) and compares the outcome with `balance`.
///
/// Reservations write no transaction, so the sum of open withdrawal requests
/// is supplied as `pending_total`.
#[must_use]
pub fn reconcile(
    balance: &Balance,
    transactions: &[LedgerTransaction],
    pending_total: Amount,
) -> ReconciliationReport {
    let mut derived = BalanceFigures {
        pending_withdrawal: pending_total.value(),
        ..BalanceFigures::default()
    };
    let mut running = Decimal::ZERO;
    let mut mismatches = Vec::new();

    for tx in transactions {
        match tx.transaction_type.effect() {
            BalanceEffect::Credit => derived.total_earnings += tx.magnitude(),
            BalanceEffect::Debit => derived.total_deductions += tx.magnitude(),
            BalanceEffect::Settlement => derived.withdrawn_amount += tx.magnitude(),
        }
        running += tx.amount;
        if tx.balance_after.value() != running {
            mismatches.push(BalanceAfterMismatch {
                transaction_id: tx.id,
                recorded: tx.balance_after.value(),
                expected: running,
            });
        }
    }

    derived.available_balance = derived.total_earnings
        - derived.total_deductions
        - derived.withdrawn_amount
        - derived.pending_withdrawal;

    let stored = BalanceFigures::from(balance);
    let is_consistent = stored == derived && mismatches.is_empty();

    ReconciliationReport {
        entity_id: balance.entity_id,
        stored,
        derived,
        transaction_count: transactions.len(),
        mismatches,
        is_consistent,
    }
}
