//! Withdrawal service for request creation and state transitions.
//!
//! This module implements the withdrawal state machine. It is pure: each
//! method validates a transition and returns the resulting action or
//! balance snapshot, leaving persistence to the settlement layer.

use chrono::{DateTime, Utc};
use fleetpay_shared::types::{Amount, UserId, WithdrawalId};

use crate::ledger::balance::Balance;
use crate::ledger::error::LedgerError;
use crate::withdrawal::types::{
    NewWithdrawal, PaymentMethod, WithdrawalAction, WithdrawalRequest, WithdrawalStatus,
};

/// Stateless service for managing withdrawal requests.
pub struct WithdrawalService;

impl WithdrawalService {
    /// Open a pending request, reserving `amount` from `balance`.
    ///
    /// # Returns
    /// * `Ok((request, reserved_balance))` on success
    /// * `Err(LedgerError::InvalidAmount)` if `amount` is zero
    /// * `Err(LedgerError::InvalidInput)` if bank details are missing
    /// * `Err(LedgerError::InsufficientBalance)` if `amount` exceeds the available balance
    pub fn open(
        balance: &Balance,
        amount: Amount,
        new: NewWithdrawal,
        now: DateTime<Utc>,
    ) -> Result<(WithdrawalRequest, Balance), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount(
                "Withdrawal amount must be greater than zero".to_string(),
            ));
        }
        Self::validate_account_details(&new)?;

        let reserved = balance.reserve(amount)?;
        let request = WithdrawalRequest {
            id: WithdrawalId::new(),
            entity_id: balance.entity_id,
            entity_kind: balance.kind,
            amount,
            payment_method: new.payment_method,
            account_details: new.account_details,
            notes: new.notes,
            status: WithdrawalStatus::Pending,
            requested_at: now,
            approved_by: None,
            reviewed_at: None,
            processed_at: None,
            admin_notes: None,
            rejection_reason: None,
        };
        Ok((request, reserved))
    }

    /// Approve a pending request.
    ///
    /// # Returns
    /// * `Ok(WithdrawalAction::Approve)` if the transition is valid
    /// * `Err(LedgerError::InvalidTransition)` if not in Pending status
    pub fn approve(
        current_status: WithdrawalStatus,
        approved_by: UserId,
        admin_notes: Option<String>,
    ) -> Result<WithdrawalAction, LedgerError> {
        match current_status {
            WithdrawalStatus::Pending => Ok(WithdrawalAction::Approve {
                new_status: WithdrawalStatus::Approved,
                approved_by,
                approved_at: Utc::now(),
                admin_notes,
            }),
            _ => Err(LedgerError::InvalidTransition {
                from: current_status,
                to: WithdrawalStatus::Approved,
            }),
        }
    }

    /// Reject a pending request.
    ///
    /// # Returns
    /// * `Ok(WithdrawalAction::Reject)` if the transition is valid
    /// * `Err(LedgerError::InvalidTransition)` if not in Pending status
    /// * `Err(LedgerError::InvalidInput)` if the reason is empty
    pub fn reject(
        current_status: WithdrawalStatus,
        rejection_reason: String,
    ) -> Result<WithdrawalAction, LedgerError> {
        if rejection_reason.trim().is_empty() {
            return Err(LedgerError::InvalidInput(
                "Rejection reason is required".to_string(),
            ));
        }

        match current_status {
            WithdrawalStatus::Pending => Ok(WithdrawalAction::Reject {
                new_status: WithdrawalStatus::Rejected,
                rejected_at: Utc::now(),
                rejection_reason,
            }),
            _ => Err(LedgerError::InvalidTransition {
                from: current_status,
                to: WithdrawalStatus::Rejected,
            }),
        }
    }

    /// Confirm external payout of an approved request.
    ///
    /// # Returns
    /// * `Ok(WithdrawalAction::Process)` if the transition is valid
    /// * `Err(LedgerError::InvalidTransition)` if not in Approved status
    pub fn mark_processed(current_status: WithdrawalStatus) -> Result<WithdrawalAction, LedgerError> {
        match current_status {
            WithdrawalStatus::Approved => Ok(WithdrawalAction::Process {
                new_status: WithdrawalStatus::Processed,
                processed_at: Utc::now(),
            }),
            _ => Err(LedgerError::InvalidTransition {
                from: current_status,
                to: WithdrawalStatus::Processed,
            }),
        }
    }

    /// Balance effect of `action` on a request of `amount`.
    ///
    /// Approval settles the reservation, rejection releases it, processing
    /// leaves the balance as it is.
    pub fn settle(
        action: &WithdrawalAction,
        balance: &Balance,
        amount: Amount,
    ) -> Result<Balance, LedgerError> {
        match action {
            WithdrawalAction::Approve { .. } => balance.settle_reservation(amount),
            WithdrawalAction::Reject { .. } => balance.release_reservation(amount),
            WithdrawalAction::Process { .. } => Ok(balance.clone()),
        }
    }

    /// Check if a status transition is valid.
    ///
    /// Valid transitions:
    /// - Pending → Approved (approve)
    /// - Pending → Rejected (reject)
    /// - Approved → Processed (mark processed)
    #[cfg(test)]
    pub(crate) fn is_valid_transition(from: WithdrawalStatus, to: WithdrawalStatus) -> bool {
        matches!(
            (from, to),
            (
                WithdrawalStatus::Pending,
                WithdrawalStatus::Approved | WithdrawalStatus::Rejected
            ) | (WithdrawalStatus::Approved, WithdrawalStatus::Processed)
        )
    }

    fn validate_account_details(new: &NewWithdrawal) -> Result<(), LedgerError> {
        if new.payment_method != PaymentMethod::BankTransfer {
            return Ok(());
        }
        match new.account_details.as_object() {
            Some(details) if !details.is_empty() => Ok(()),
            _ => Err(LedgerError::InvalidInput(
                "Bank transfer requires account details".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::EntityKind;
    use fleetpay_shared::types::EntityId;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn funded(value: rust_decimal::Decimal) -> Balance {
        Balance::open(EntityId::new(), EntityKind::Driver, Utc::now())
            .credit(Amount::new(value).unwrap())
            .unwrap()
    }

    fn bank() -> NewWithdrawal {
        NewWithdrawal {
            payment_method: PaymentMethod::BankTransfer,
            account_details: json!({"bank_name": "First Bank", "account_number": "0123456789"}),
            notes: None,
        }
    }

    #[test]
    fn test_open_reserves_amount() {
        let balance = funded(dec!(700));
        let (request, reserved) =
            WithdrawalService::open(&balance, Amount::new(dec!(500)).unwrap(), bank(), Utc::now())
                .unwrap();
        assert_eq!(request.status, WithdrawalStatus::Pending);
        assert_eq!(request.entity_id, balance.entity_id);
        assert_eq!(request.entity_kind, EntityKind::Driver);
        assert_eq!(reserved.available_balance.value(), dec!(200));
        assert_eq!(reserved.pending_withdrawal.value(), dec!(500));
    }

    #[test]
    fn test_open_carries_notes() {
        let balance = funded(dec!(700));
        let new = NewWithdrawal {
            notes: Some("weekly payout".to_string()),
            ..bank()
        };
        let (request, _) =
            WithdrawalService::open(&balance, Amount::new(dec!(100)).unwrap(), new, Utc::now())
                .unwrap();
        assert_eq!(request.notes.as_deref(), Some("weekly payout"));
        assert_eq!(request.admin_notes, None);
    }

    #[test]
    fn test_open_insufficient_balance() {
        let balance = funded(dec!(200));
        let err =
            WithdrawalService::open(&balance, Amount::new(dec!(1000)).unwrap(), bank(), Utc::now())
                .unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_BALANCE");
    }

    #[test]
    fn test_open_rejects_zero() {
        let balance = funded(dec!(200));
        let err = WithdrawalService::open(&balance, Amount::ZERO, bank(), Utc::now()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_AMOUNT");
    }

    #[test]
    fn test_bank_transfer_requires_details() {
        let balance = funded(dec!(200));
        let new = NewWithdrawal {
            payment_method: PaymentMethod::BankTransfer,
            account_details: serde_json::Value::Null,
            notes: None,
        };
        let err = WithdrawalService::open(&balance, Amount::new(dec!(10)).unwrap(), new, Utc::now())
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");

        let cash = NewWithdrawal {
            payment_method: PaymentMethod::Cash,
            account_details: serde_json::Value::Null,
            notes: None,
        };
        assert!(
            WithdrawalService::open(&balance, Amount::new(dec!(10)).unwrap(), cash, Utc::now())
                .is_ok()
        );
    }

    #[test]
    fn test_approve_from_pending() {
        let approver = UserId::new();
        let action =
            WithdrawalService::approve(WithdrawalStatus::Pending, approver, Some("ok".into()))
                .unwrap();
        assert_eq!(action.new_status(), WithdrawalStatus::Approved);
    }

    #[test]
    fn test_approve_twice_is_invalid_transition() {
        let err = WithdrawalService::approve(WithdrawalStatus::Approved, UserId::new(), None)
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InvalidTransition {
                from: WithdrawalStatus::Approved,
                to: WithdrawalStatus::Approved,
            }
        );
    }

    #[test]
    fn test_reject_requires_reason() {
        let err = WithdrawalService::reject(WithdrawalStatus::Pending, "  ".into()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_reject_after_approve_is_invalid() {
        assert!(matches!(
            WithdrawalService::reject(WithdrawalStatus::Approved, "late".into()),
            Err(LedgerError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_mark_processed_only_from_approved() {
        assert!(WithdrawalService::mark_processed(WithdrawalStatus::Approved).is_ok());
        assert!(WithdrawalService::mark_processed(WithdrawalStatus::Pending).is_err());
        assert!(WithdrawalService::mark_processed(WithdrawalStatus::Processed).is_err());
    }

    #[test]
    fn test_settle_and_release() {
        let balance = funded(dec!(700));
        let amount = Amount::new(dec!(500)).unwrap();
        let (request, reserved) =
            WithdrawalService::open(&balance, amount, bank(), Utc::now()).unwrap();

        let approve =
            WithdrawalService::approve(request.status, UserId::new(), None).unwrap();
        let settled = WithdrawalService::settle(&approve, &reserved, amount).unwrap();
        assert_eq!(settled.withdrawn_amount, amount);
        assert_eq!(settled.available_balance.value(), dec!(200));

        let reject = WithdrawalService::reject(request.status, "duplicate".into()).unwrap();
        let released = WithdrawalService::settle(&reject, &reserved, amount).unwrap();
        assert_eq!(released.available_balance, balance.available_balance);

        let approved = approve.apply(request);
        assert_eq!(approved.status, WithdrawalStatus::Approved);
        assert!(approved.approved_by.is_some());
    }
}
