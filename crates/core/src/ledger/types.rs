//! Ledger domain types.
//!
//! Entity kinds, transaction types and the filters used by read paths.

use chrono::{DateTime, Utc};
use fleetpay_shared::types::Amount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of entity that holds a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A delivery driver, credited with a share of each order.
    Driver,
    /// A restaurant, credited with order revenue net of the platform fee.
    Restaurant,
}

impl EntityKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Driver => "driver",
            Self::Restaurant => "restaurant",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a transaction type moves the book balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceEffect {
    /// Adds to total earnings and available balance.
    Credit,
    /// Removes from available balance and adds to total deductions.
    Debit,
    /// Settles a reservation into the withdrawn amount.
    Settlement,
}

/// Type of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Earnings from a delivered order.
    Commission,
    /// Manual credit by an operator.
    ManualAdd,
    /// Incentive payment.
    Bonus,
    /// Correction that reduces the balance.
    Adjustment,
    /// Correction that restores money to the balance.
    Refund,
    /// Penalty or fee taken from the balance.
    Deduction,
    /// Approved driver withdrawal.
    Withdrawal,
    /// Approved restaurant payout.
    Payout,
}

impl TransactionType {
    /// All transaction types, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Commission,
        Self::ManualAdd,
        Self::Bonus,
        Self::Adjustment,
        Self::Refund,
        Self::Deduction,
        Self::Withdrawal,
        Self::Payout,
    ];

    /// Returns the string representation of the type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commission => "commission",
            Self::ManualAdd => "manual_add",
            Self::Bonus => "bonus",
            Self::Adjustment => "adjustment",
            Self::Refund => "refund",
            Self::Deduction => "deduction",
            Self::Withdrawal => "withdrawal",
            Self::Payout => "payout",
        }
    }

    /// Parses a type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
    }

    /// Returns how this type moves the balance.
    #[must_use]
    pub fn effect(&self) -> BalanceEffect {
        match self {
            Self::Commission | Self::ManualAdd | Self::Bonus | Self::Refund => BalanceEffect::Credit,
            Self::Adjustment | Self::Deduction => BalanceEffect::Debit,
            Self::Withdrawal | Self::Payout => BalanceEffect::Settlement,
        }
    }

    /// Signed effect of `amount` on the book balance.
    #[must_use]
    pub fn signed(&self, amount: Amount) -> Decimal {
        match self.effect() {
            BalanceEffect::Credit => amount.value(),
            BalanceEffect::Debit | BalanceEffect::Settlement => -amount.value(),
        }
    }

    /// Transaction type written when a withdrawal for `kind` is approved.
    #[must_use]
    pub fn settlement_for(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Driver => Self::Withdrawal,
            EntityKind::Restaurant => Self::Payout,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Time window with optional, inclusive bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Earliest creation time to include.
    pub from: Option<DateTime<Utc>>,
    /// Latest creation time to include.
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Creates a range from optional bounds.
    #[must_use]
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    /// Returns true if `at` falls inside the range.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at <= to)
    }

    /// Returns true if `from` is after `to`.
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        matches!((self.from, self.to), (Some(from), Some(to)) if from > to)
    }
}

/// Filter for listing an entity's transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Only include this transaction type.
    pub transaction_type: Option<TransactionType>,
    /// Only include transactions created in this window.
    pub period: DateRange,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(TransactionType::Commission, dec!(700))]
    #[case(TransactionType::ManualAdd, dec!(700))]
    #[case(TransactionType::Bonus, dec!(700))]
    #[case(TransactionType::Refund, dec!(700))]
    #[case(TransactionType::Deduction, dec!(-700))]
    #[case(TransactionType::Adjustment, dec!(-700))]
    #[case(TransactionType::Withdrawal, dec!(-700))]
    #[case(TransactionType::Payout, dec!(-700))]
    fn test_signed_effect(#[case] kind: TransactionType, #[case] expected: Decimal) {
        let amount = Amount::new(dec!(700)).unwrap();
        assert_eq!(kind.signed(amount), expected);
    }

    #[test]
    fn test_transaction_type_roundtrip() {
        for kind in TransactionType::ALL {
            assert_eq!(TransactionType::parse(kind.as_str()), Some(kind));
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert_eq!(TransactionType::parse("MANUAL_ADD"), Some(TransactionType::ManualAdd));
        assert_eq!(TransactionType::parse("wire"), None);
    }

    #[test]
    fn test_settlement_type_per_kind() {
        assert_eq!(
            TransactionType::settlement_for(EntityKind::Driver),
            TransactionType::Withdrawal
        );
        assert_eq!(
            TransactionType::settlement_for(EntityKind::Restaurant),
            TransactionType::Payout
        );
    }

    #[test]
    fn test_date_range_contains() {
        let now = Utc::now();
        let range = DateRange::new(Some(now - Duration::hours(1)), Some(now));
        assert!(range.contains(now));
        assert!(range.contains(now - Duration::hours(1)));
        assert!(!range.contains(now + Duration::seconds(1)));
        assert!(DateRange::default().contains(now));
        assert!(DateRange::new(Some(now), Some(now - Duration::hours(1))).is_inverted());
    }
}
