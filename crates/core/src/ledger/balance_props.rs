//! Property-based tests for balance mutations.
//!
//! Random interleavings of credit/debit/reserve/settle/release must keep the
//! balance decomposition exact and the transaction log replayable.

use chrono::Utc;
use fleetpay_shared::types::{Amount, EntityId};
use proptest::prelude::*;

use crate::ledger::balance::Balance;
use crate::ledger::reconcile::reconcile;
use crate::ledger::transaction::LedgerTransaction;
use crate::ledger::types::{EntityKind, TransactionType};

#[derive(Debug, Clone)]
enum Op {
    Credit(i64),
    Debit(i64),
    Reserve(i64),
    Settle,
    Release,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..500_000).prop_map(Op::Credit),
        (1i64..500_000).prop_map(Op::Debit),
        (1i64..500_000).prop_map(Op::Reserve),
        Just(Op::Settle),
        Just(Op::Release),
    ]
}

fn cents(value: i64) -> Amount {
    Amount::from_minor(value).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The decomposition holds after every operation, rejected operations
    /// leave the balance untouched, and the log reconciles at the end.
    #[test]
    fn prop_random_interleavings_reconcile(ops in prop::collection::vec(arb_op(), 1..60)) {
        let mut balance = Balance::open(EntityId::new(), EntityKind::Driver, Utc::now());
        let mut log: Vec<LedgerTransaction> = Vec::new();
        let mut reservations: Vec<Amount> = Vec::new();

        for op in ops {
            let before = balance.clone();
            match op {
                Op::Credit(value) => {
                    balance = balance.credit(cents(value)).unwrap().next_version(Utc::now());
                    log.push(LedgerTransaction::record(
                        &balance, TransactionType::ManualAdd, cents(value), "credit", None,
                    ).unwrap());
                }
                Op::Debit(value) => match balance.debit(cents(value)) {
                    Ok(next) => {
                        balance = next.next_version(Utc::now());
                        log.push(LedgerTransaction::record(
                            &balance, TransactionType::Deduction, cents(value), "debit", None,
                        ).unwrap());
                    }
                    Err(_) => {
                        prop_assert!(cents(value) > before.available_balance);
                        prop_assert_eq!(&balance, &before);
                    }
                },
                Op::Reserve(value) => match balance.reserve(cents(value)) {
                    Ok(next) => {
                        balance = next.next_version(Utc::now());
                        reservations.push(cents(value));
                    }
                    Err(_) => prop_assert!(cents(value) > before.available_balance),
                },
                Op::Settle => {
                    if let Some(held) = reservations.pop() {
                        balance = balance.settle_reservation(held).unwrap().next_version(Utc::now());
                        log.push(LedgerTransaction::record(
                            &balance, TransactionType::Withdrawal, held, "settle", None,
                        ).unwrap());
                    }
                }
                Op::Release => {
                    if let Some(held) = reservations.pop() {
                        balance = balance.release_reservation(held).unwrap().next_version(Utc::now());
                        prop_assert_eq!(balance.book_balance().unwrap(), before.book_balance().unwrap());
                    }
                }
            }
            prop_assert!(balance.is_consistent());
            prop_assert!(balance.total_earnings >= before.total_earnings);
        }

        let pending = Amount::try_sum(reservations.iter().copied()).unwrap();
        prop_assert_eq!(pending, balance.pending_withdrawal);
        let report = reconcile(&balance, &log, pending);
        prop_assert!(report.is_consistent, "{:?}", report);
    }

    /// Reserve then release is the identity on available balance.
    #[test]
    fn prop_reserve_release_conserves(credit in 1i64..1_000_000, hold in 1i64..1_000_000) {
        prop_assume!(hold <= credit);
        let balance = Balance::open(EntityId::new(), EntityKind::Restaurant, Utc::now())
            .credit(cents(credit))
            .unwrap();
        let restored = balance.reserve(cents(hold)).unwrap().release_reservation(cents(hold)).unwrap();
        prop_assert_eq!(restored.available_balance, balance.available_balance);
        prop_assert_eq!(restored.pending_withdrawal, Amount::ZERO);
    }

    /// Reserve then settle moves exactly `hold` into the withdrawn amount.
    #[test]
    fn prop_reserve_settle_moves_amount(credit in 1i64..1_000_000, hold in 1i64..1_000_000) {
        prop_assume!(hold <= credit);
        let balance = Balance::open(EntityId::new(), EntityKind::Driver, Utc::now())
            .credit(cents(credit))
            .unwrap();
        let settled = balance.reserve(cents(hold)).unwrap().settle_reservation(cents(hold)).unwrap();
        prop_assert_eq!(
            Some(settled.available_balance),
            balance.available_balance.checked_sub(cents(hold))
        );
        prop_assert_eq!(settled.withdrawn_amount, cents(hold));
    }
}
