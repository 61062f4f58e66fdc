//! Property-based tests for commission computation.

use chrono::Utc;
use fleetpay_shared::types::{Amount, EntityId, Rate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::commission::engine::{CommissionEngine, ValidatedOrder};
use crate::ledger::types::EntityKind;

fn arb_kind() -> impl Strategy<Value = EntityKind> {
    prop_oneof![Just(EntityKind::Driver), Just(EntityKind::Restaurant)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The credited amount never exceeds the order total, and for restaurants
    /// the fee plus the credit is exactly the order total.
    #[test]
    fn prop_credit_bounded_by_order(
        kind in arb_kind(),
        cents in 0i64..100_000_000,
        basis_points in 0i64..=10_000,
    ) {
        let order = ValidatedOrder {
            order_id: "order".to_string(),
            order_amount: Amount::from_minor(cents).unwrap(),
            commission_rate: None,
        };
        let rate = Rate::new(Decimal::new(basis_points, 2)).unwrap();
        let commission = CommissionEngine::compute(EntityId::new(), kind, &order, rate, Utc::now()).unwrap();

        prop_assert!(commission.credited_amount <= commission.order_amount);
        prop_assert!(commission.commission_amount <= commission.order_amount);
        match kind {
            EntityKind::Driver => {
                prop_assert_eq!(commission.credited_amount, commission.commission_amount);
            }
            EntityKind::Restaurant => {
                prop_assert_eq!(
                    commission.credited_amount.checked_add(commission.commission_amount).unwrap(),
                    commission.order_amount
                );
            }
        }
    }
}
