//! Property-based tests for WithdrawalService.

use chrono::Utc;
use fleetpay_shared::types::{Amount, EntityId, UserId};
use proptest::prelude::*;
use uuid::Uuid;

use crate::ledger::balance::Balance;
use crate::ledger::error::LedgerError;
use crate::ledger::types::EntityKind;
use crate::withdrawal::service::WithdrawalService;
use crate::withdrawal::types::{NewWithdrawal, PaymentMethod, WithdrawalStatus};

/// Strategy for generating random WithdrawalStatus values.
fn arb_status() -> impl Strategy<Value = WithdrawalStatus> {
    prop_oneof![
        Just(WithdrawalStatus::Pending),
        Just(WithdrawalStatus::Approved),
        Just(WithdrawalStatus::Rejected),
        Just(WithdrawalStatus::Processed),
    ]
}

fn arb_user() -> impl Strategy<Value = UserId> {
    any::<u128>().prop_map(|n| UserId::from_uuid(Uuid::from_u128(n)))
}

fn arb_reason() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9]{1,40}"
}

fn cash() -> NewWithdrawal {
    NewWithdrawal {
        payment_method: PaymentMethod::Cash,
        account_details: serde_json::Value::Null,
        notes: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every transition the service accepts is one the transition table allows.
    #[test]
    fn prop_accepted_transitions_are_valid(
        status in arb_status(),
        user in arb_user(),
        reason in arb_reason(),
    ) {
        let attempts = [
            WithdrawalService::approve(status, user, None),
            WithdrawalService::reject(status, reason),
            WithdrawalService::mark_processed(status),
        ];
        for attempt in attempts {
            match attempt {
                Ok(action) => prop_assert!(
                    WithdrawalService::is_valid_transition(status, action.new_status())
                ),
                Err(LedgerError::InvalidTransition { from, to }) => {
                    prop_assert_eq!(from, status);
                    prop_assert!(!WithdrawalService::is_valid_transition(from, to));
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }

    /// Terminal statuses accept no transition.
    #[test]
    fn prop_terminal_states_are_final(status in arb_status(), user in arb_user()) {
        prop_assume!(status.is_terminal());
        prop_assert!(WithdrawalService::approve(status, user, None).is_err());
        prop_assert!(WithdrawalService::reject(status, "again".into()).is_err());
        prop_assert!(WithdrawalService::mark_processed(status).is_err());
    }

    /// Open then reject leaves the available balance unchanged; open then
    /// approve reduces it by the amount and grows the withdrawn amount by it.
    #[test]
    fn prop_withdrawal_conservation(credit in 1i64..10_000_000, ask in 1i64..10_000_000) {
        let balance = Balance::open(EntityId::new(), EntityKind::Driver, Utc::now())
            .credit(Amount::from_minor(credit).unwrap())
            .unwrap();
        let amount = Amount::from_minor(ask).unwrap();

        match WithdrawalService::open(&balance, amount, cash(), Utc::now()) {
            Ok((request, reserved)) => {
                let reject = WithdrawalService::reject(request.status, "no".into()).unwrap();
                let released = WithdrawalService::settle(&reject, &reserved, amount).unwrap();
                prop_assert_eq!(released.available_balance, balance.available_balance);

                let approve = WithdrawalService::approve(request.status, UserId::new(), None).unwrap();
                let settled = WithdrawalService::settle(&approve, &reserved, amount).unwrap();
                prop_assert_eq!(
                    Some(settled.available_balance),
                    balance.available_balance.checked_sub(amount)
                );
                prop_assert_eq!(settled.withdrawn_amount, balance.withdrawn_amount.checked_add(amount).unwrap());
            }
            Err(LedgerError::InsufficientBalance { .. }) => prop_assert!(ask > credit),
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }
}
