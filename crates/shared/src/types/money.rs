//! Money types with decimal precision.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! `Amount` wraps `rust_decimal::Decimal` and is always a non-negative value
//! expressed in whole minor units (two decimal places), below
//! `AMOUNT_LIMIT`. `Rate` is a percentage in `[0, 100]` with at most two
//! decimal places. Both bounds match the `NUMERIC(19,2)` and `NUMERIC(5,2)`
//! columns they are stored in.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of decimal places of the minor unit (cents).
pub const MINOR_UNIT_SCALE: u32 = 2;

/// Exclusive upper bound of an `Amount` (17 integer digits).
pub const AMOUNT_LIMIT: Decimal = Decimal::from_parts(1_569_325_056, 23_283_064, 0, false, 0);

/// Errors raised when constructing money values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Amount is negative where a non-negative value is required.
    #[error("Amount cannot be negative: {0}")]
    Negative(Decimal),

    /// Amount has more precision than the minor unit allows.
    #[error("Amount {0} has more than {MINOR_UNIT_SCALE} decimal places")]
    TooPrecise(Decimal),

    /// Amount at or above `AMOUNT_LIMIT`, or a sum that would reach it.
    #[error("Amount {0} exceeds the largest supported amount")]
    TooLarge(Decimal),

    /// Percentage rate outside `[0, 100]`.
    #[error("Rate must be between 0 and 100, got {0}")]
    RateOutOfRange(Decimal),

    /// Percentage rate with more than two decimal places.
    #[error("Rate {0} has more than {MINOR_UNIT_SCALE} decimal places")]
    RateTooPrecise(Decimal),
}

/// A non-negative monetary amount in the platform currency.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates an amount, rejecting negative, oversized or sub-minor-unit values.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AmountError::Negative(value));
        }
        if value >= AMOUNT_LIMIT {
            return Err(AmountError::TooLarge(value));
        }
        if value.normalize().scale() > MINOR_UNIT_SCALE {
            return Err(AmountError::TooPrecise(value));
        }
        Ok(Self(value.round_dp(MINOR_UNIT_SCALE).normalize()))
    }

    /// Creates an amount from a count of minor units (e.g. cents).
    pub fn from_minor(minor_units: i64) -> Result<Self, AmountError> {
        Self::new(Decimal::new(minor_units, MINOR_UNIT_SCALE))
    }

    /// Returns the decimal value.
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Adds `rhs`, failing if the sum reaches `AMOUNT_LIMIT`.
    pub fn checked_add(self, rhs: Self) -> Result<Self, AmountError> {
        let sum = self
            .0
            .checked_add(rhs.0)
            .ok_or(AmountError::TooLarge(self.0))?;
        Self::new(sum)
    }

    /// Subtracts `rhs`, returning `None` if the result would be negative.
    #[must_use]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        if rhs.0 > self.0 {
            None
        } else {
            Some(Self((self.0 - rhs.0).normalize()))
        }
    }

    /// Applies a percentage, rounding half-up to the minor unit.
    ///
    /// `1000 × 70% = 700`, `0.05 × 50% = 0.03`.
    pub fn percentage(self, rate: Rate) -> Result<Self, AmountError> {
        let raw = self
            .0
            .checked_mul(rate.value())
            .and_then(|product| product.checked_div(Decimal::ONE_HUNDRED))
            .ok_or(AmountError::TooLarge(self.0))?;
        Self::new(
            raw.round_dp_with_strategy(MINOR_UNIT_SCALE, RoundingStrategy::MidpointAwayFromZero)
                .normalize(),
        )
    }

    /// Sums `amounts`, failing if the total reaches `AMOUNT_LIMIT`.
    pub fn try_sum<I>(amounts: I) -> Result<Self, AmountError>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |total, amount| total.checked_add(amount))
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// A percentage rate between 0 and 100 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Rate(Decimal);

impl Rate {
    /// 0%.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a rate, rejecting values outside `[0, 100]` or finer than
    /// a hundredth of a percent.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(AmountError::RateOutOfRange(value));
        }
        if value.normalize().scale() > MINOR_UNIT_SCALE {
            return Err(AmountError::RateTooPrecise(value));
        }
        Ok(Self(value.normalize()))
    }

    /// Returns the percentage value.
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Rate {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rate> for Decimal {
    fn from(rate: Rate) -> Self {
        rate.0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_new() {
        let amount = Amount::new(dec!(100.50)).unwrap();
        assert_eq!(amount.value(), dec!(100.5));
        assert_eq!(amount.to_string(), "100.50");
    }

    #[test]
    fn test_amount_rejects_negative() {
        assert_eq!(
            Amount::new(dec!(-0.01)),
            Err(AmountError::Negative(dec!(-0.01)))
        );
    }

    #[test]
    fn test_amount_rejects_sub_cent() {
        assert!(matches!(
            Amount::new(dec!(1.005)),
            Err(AmountError::TooPrecise(_))
        ));
        // Trailing zeros are not extra precision
        assert!(Amount::new(dec!(1.5000)).is_ok());
    }

    #[test]
    fn test_amount_from_minor() {
        assert_eq!(Amount::from_minor(12_345).unwrap().value(), dec!(123.45));
        assert!(Amount::from_minor(-1).is_err());
    }

    #[test]
    fn test_checked_sub() {
        let a = Amount::new(dec!(700)).unwrap();
        let b = Amount::new(dec!(500)).unwrap();
        assert_eq!(a.checked_sub(b), Some(Amount::new(dec!(200)).unwrap()));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(a.checked_sub(a), Some(Amount::ZERO));
    }

    #[rstest]
    #[case(dec!(1000), dec!(70), dec!(700))]
    #[case(dec!(1000), dec!(10), dec!(100))]
    #[case(dec!(0.05), dec!(50), dec!(0.03))]
    #[case(dec!(0.15), dec!(10), dec!(0.02))]
    #[case(dec!(33.33), dec!(33.3), dec!(11.1))]
    #[case(dec!(99.99), dec!(0), dec!(0))]
    #[case(dec!(99.99), dec!(100), dec!(99.99))]
    fn test_percentage_rounds_half_up(
        #[case] base: Decimal,
        #[case] rate: Decimal,
        #[case] expected: Decimal,
    ) {
        let amount = Amount::new(base).unwrap();
        let rate = Rate::new(rate).unwrap();
        assert_eq!(amount.percentage(rate).unwrap().value(), expected);
    }

    #[test]
    fn test_amount_limit_is_ten_to_the_seventeenth() {
        assert_eq!(AMOUNT_LIMIT, Decimal::from(100_000_000_000_000_000_i64));
    }

    #[rstest]
    #[case(Decimal::MAX)]
    #[case(dec!(50000000000000000000000000000))]
    #[case(dec!(100000000000000000))]
    fn test_amount_rejects_oversized(#[case] value: Decimal) {
        assert_eq!(Amount::new(value), Err(AmountError::TooLarge(value)));
    }

    #[test]
    fn test_largest_amount_is_accepted() {
        let largest = Amount::new(dec!(99999999999999999.99)).unwrap();
        assert_eq!(largest.value(), dec!(99999999999999999.99));
        // A full percentage of the largest amount stays in range.
        let all = largest.percentage(Rate::new(dec!(100)).unwrap()).unwrap();
        assert_eq!(all, largest);
    }

    #[test]
    fn test_checked_add_stops_at_limit() {
        let largest = Amount::new(dec!(99999999999999999.99)).unwrap();
        let cent = Amount::new(dec!(0.01)).unwrap();
        assert!(matches!(
            largest.checked_add(cent),
            Err(AmountError::TooLarge(_))
        ));
        assert_eq!(
            Amount::new(dec!(1.10)).unwrap().checked_add(cent).unwrap().value(),
            dec!(1.11)
        );
    }

    #[test]
    fn test_try_sum_rejects_overflowing_total() {
        let half = Amount::new(dec!(50000000000000000)).unwrap();
        assert!(Amount::try_sum([half, half]).is_err());
        assert_eq!(Amount::try_sum([]).unwrap(), Amount::ZERO);
    }

    #[rstest]
    #[case(dec!(-0.5))]
    #[case(dec!(100.01))]
    fn test_rate_out_of_range(#[case] value: Decimal) {
        assert_eq!(Rate::new(value), Err(AmountError::RateOutOfRange(value)));
    }

    #[rstest]
    #[case(dec!(12.345))]
    #[case(dec!(0.001))]
    fn test_rate_rejects_sub_hundredth(#[case] value: Decimal) {
        assert_eq!(Rate::new(value), Err(AmountError::RateTooPrecise(value)));
    }

    #[test]
    fn test_rate_accepts_two_places() {
        assert_eq!(Rate::new(dec!(12.35)).unwrap().value(), dec!(12.35));
        // Trailing zeros are not extra precision
        assert_eq!(Rate::new(dec!(15.000)).unwrap().value(), dec!(15));
    }

    #[test]
    fn test_amount_serde_as_string() {
        let amount = Amount::new(dec!(12.30)).unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"12.3\"");
        let back: Amount = serde_json::from_str("\"12.30\"").unwrap();
        assert_eq!(back, amount);
        assert!(serde_json::from_str::<Amount>("\"-1\"").is_err());
    }

    #[test]
    fn test_try_sum() {
        let total = Amount::try_sum(
            [dec!(1.10), dec!(2.20), dec!(3.30)]
                .into_iter()
                .map(|d| Amount::new(d).unwrap()),
        )
        .unwrap();
        assert_eq!(total.value(), dec!(6.6));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// A percentage of an amount never exceeds the amount and never goes negative.
        #[test]
        fn prop_percentage_bounded(cents in 0i64..10_000_000, bp in 0i64..=10_000) {
            let amount = Amount::from_minor(cents).unwrap();
            let rate = Rate::new(Decimal::new(bp, 2)).unwrap();
            let share = amount.percentage(rate).unwrap();
            prop_assert!(share <= amount);
            prop_assert!(share.value().scale() <= MINOR_UNIT_SCALE);
        }

        /// Adding then subtracting the same amount is the identity.
        #[test]
        fn prop_add_sub_identity(a in 0i64..1_000_000_000, b in 0i64..1_000_000_000) {
            let a = Amount::from_minor(a).unwrap();
            let b = Amount::from_minor(b).unwrap();
            prop_assert_eq!(a.checked_add(b).unwrap().checked_sub(b), Some(a));
        }
    }
}
