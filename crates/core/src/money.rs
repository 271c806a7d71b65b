//! Exact decimal money.
//!
//! All monetary arithmetic goes through `rust_decimal::Decimal`; there is no
//! floating point on any monetary path and no implicit rounding. Overflow is
//! reported as `DomainError::Overflow` instead of panicking.

use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// An amount of currency, exact to the scale it was created with.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `self × quantity`, exact.
    pub fn times(&self, quantity: i64) -> DomainResult<Money> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Money)
            .ok_or_else(|| DomainError::overflow(format!("{self} x {quantity}")))
    }

    /// `self × rate`, exact (the scale of the result is the sum of both scales).
    pub fn scaled_by(&self, rate: Decimal) -> DomainResult<Money> {
        self.0
            .checked_mul(rate)
            .map(Money)
            .ok_or_else(|| DomainError::overflow(format!("{self} x {rate}")))
    }

    pub fn checked_add(&self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::overflow(format!("{self} + {other}")))
    }

    /// Numeric equality, ignoring scale (`50.0 == 50.00`).
    pub fn same_amount(&self, other: &Money) -> bool {
        self.0.cmp(&other.0).is_eq()
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl FromStr for Money {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map(Money)
            .map_err(|e| DomainError::validation(format!("invalid amount '{s}': {e}")))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn times_is_exact() {
        let price = Money::new(dec!(49.99));
        assert_eq!(price.times(5).unwrap(), Money::new(dec!(249.95)));
    }

    #[test]
    fn scaled_by_keeps_full_precision() {
        let total = Money::new(dec!(100.01));
        let scaled = total.scaled_by(dec!(0.10)).unwrap();
        assert_eq!(scaled.amount(), dec!(10.001));
        assert_eq!(scaled.to_string(), "10.0010");
    }

    #[test]
    fn overflow_is_an_error_not_a_panic() {
        let huge = Money::new(Decimal::MAX);
        assert!(matches!(huge.times(2), Err(DomainError::Overflow(_))));
        assert!(huge.checked_add(huge).is_err());
    }

    #[test]
    fn same_amount_ignores_scale() {
        assert!(Money::new(dec!(50.0)).same_amount(&Money::new(dec!(50.00))));
        assert!(!Money::new(dec!(50.01)).same_amount(&Money::new(dec!(50.00))));
    }

    #[test]
    fn parses_from_string() {
        let m: Money = " 19.50 ".parse().unwrap();
        assert_eq!(m, Money::new(dec!(19.50)));
        assert!("abc".parse::<Money>().is_err());
    }
}
