//! Entity balance and its invariant-preserving mutations.
//!
//! A `Balance` is a value: every mutation returns the post-mutation snapshot
//! and leaves the original untouched, so a unit of work can compute its
//! outcome first and hand the result to storage in one commit. None of these
//! methods writes a transaction; callers pair them with a transaction record.
//!
//! Invariants held by every snapshot produced here:
//! - `available_balance = total_earnings - total_deductions - withdrawn_amount - pending_withdrawal`
//! - every figure is non-negative and below `AMOUNT_LIMIT` (`Amount` holds
//!   neither); a mutation that would break the bound fails with `InvalidAmount`

use chrono::{DateTime, Utc};
use fleetpay_shared::types::{Amount, EntityId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::error::LedgerError;
use crate::ledger::types::EntityKind;

/// Current financial state of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// The entity owning this balance.
    pub entity_id: EntityId,
    /// Driver or restaurant.
    pub kind: EntityKind,
    /// Sum of all credits ever applied. Never decreases.
    pub total_earnings: Amount,
    /// Sum of all debits (deductions and adjustments).
    pub total_deductions: Amount,
    /// Sum of settled withdrawals.
    pub withdrawn_amount: Amount,
    /// Sum of withdrawals reserved but not yet settled or released.
    pub pending_withdrawal: Amount,
    /// The only amount a new withdrawal or debit may draw from.
    pub available_balance: Amount,
    /// Incremented once per committed unit of work.
    pub version: i64,
    /// When the ledger was opened.
    pub created_at: DateTime<Utc>,
    /// When the last unit of work committed.
    pub updated_at: DateTime<Utc>,
}

impl Balance {
    /// Creates a zeroed balance for a newly onboarded entity.
    #[must_use]
    pub fn open(entity_id: EntityId, kind: EntityKind, now: DateTime<Utc>) -> Self {
        Self {
            entity_id,
            kind,
            total_earnings: Amount::ZERO,
            total_deductions: Amount::ZERO,
            withdrawn_amount: Amount::ZERO,
            pending_withdrawal: Amount::ZERO,
            available_balance: Amount::ZERO,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Book balance: money the entity still holds on the platform,
    /// whether available or reserved.
    pub fn book_balance(&self) -> Result<Amount, LedgerError> {
        Ok(self.available_balance.checked_add(self.pending_withdrawal)?)
    }

    /// Increases total earnings and the available balance.
    pub fn credit(&self, amount: Amount) -> Result<Self, LedgerError> {
        Ok(Self {
            total_earnings: self.total_earnings.checked_add(amount)?,
            available_balance: self.available_balance.checked_add(amount)?,
            ..self.clone()
        })
    }

    /// Decreases the available balance, recording the amount as a deduction.
    pub fn debit(&self, amount: Amount) -> Result<Self, LedgerError> {
        let available_balance = self.draw_available(amount)?;
        Ok(Self {
            total_deductions: self.total_deductions.checked_add(amount)?,
            available_balance,
            ..self.clone()
        })
    }

    /// Moves `amount` from the available balance into the pending reservation.
    pub fn reserve(&self, amount: Amount) -> Result<Self, LedgerError> {
        let available_balance = self.draw_available(amount)?;
        Ok(Self {
            pending_withdrawal: self.pending_withdrawal.checked_add(amount)?,
            available_balance,
            ..self.clone()
        })
    }

    /// Moves `amount` from the pending reservation into the withdrawn amount.
    pub fn settle_reservation(&self, amount: Amount) -> Result<Self, LedgerError> {
        let pending_withdrawal = self.draw_reserved(amount)?;
        Ok(Self {
            pending_withdrawal,
            withdrawn_amount: self.withdrawn_amount.checked_add(amount)?,
            ..self.clone()
        })
    }

    /// Moves `amount` from the pending reservation back to the available balance.
    pub fn release_reservation(&self, amount: Amount) -> Result<Self, LedgerError> {
        let pending_withdrawal = self.draw_reserved(amount)?;
        Ok(Self {
            pending_withdrawal,
            available_balance: self.available_balance.checked_add(amount)?,
            ..self.clone()
        })
    }

    /// Stamps the snapshot as the next committed version.
    #[must_use]
    pub fn next_version(self, now: DateTime<Utc>) -> Self {
        Self {
            version: self.version + 1,
            updated_at: now,
            ..self
        }
    }

    /// Returns true if the figures decompose exactly.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let accounted: Decimal = self.total_deductions.value()
            + self.withdrawn_amount.value()
            + self.pending_withdrawal.value()
            + self.available_balance.value();
        accounted == self.total_earnings.value()
    }

    fn draw_available(&self, amount: Amount) -> Result<Amount, LedgerError> {
        self.available_balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                requested: amount,
                available: self.available_balance,
            })
    }

    fn draw_reserved(&self, amount: Amount) -> Result<Amount, LedgerError> {
        self.pending_withdrawal
            .checked_sub(amount)
            .ok_or(LedgerError::ReservationExceeded {
                requested: amount,
                reserved: self.pending_withdrawal,
            })
    }
}
