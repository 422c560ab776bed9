use crate::error::ValidationError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

/// Number of decimal places every monetary value is kept at.
pub const MONEY_SCALE: u32 = 2;

/// Rounds a monetary value to two decimal places, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Represents a monetary value with 2 decimal places precision.
///
/// Wraps `rust_decimal::Decimal` so totals, order amounts and balances go
/// through the same rounding rule at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(Decimal);

/// A strictly positive monetary amount (top-ups, debits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        let value = round_money(value);
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(ValidationError::NonPositiveAmount)
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = ValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(round_money(amount))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.0 + rhs.0)
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.0 - rhs.0)
    }
}

impl AddAssign for Balance {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Balance {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

/// Unit price times quantity, rounded at the point of computation.
impl Mul<u32> for Balance {
    type Output = Self;
    fn mul(self, rhs: u32) -> Self::Output {
        Self::new(self.0 * Decimal::from(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balance_arithmetic() {
        let b1 = Balance::new(dec!(10.0));
        let b2 = Balance::new(dec!(5.5));
        assert_eq!(b1 + b2, Balance::new(dec!(15.5)));
        assert_eq!(b1 - b2, Balance::new(dec!(4.5)));
    }

    #[test]
    fn test_rounding_at_construction() {
        assert_eq!(Balance::new(dec!(1.005)).value(), dec!(1.01));
        assert_eq!(Balance::new(dec!(1.004)).value(), dec!(1.00));
        assert_eq!(Amount::new(dec!(15.499)).unwrap().value(), dec!(15.50));
    }

    #[test]
    fn test_price_times_quantity() {
        let unit = Balance::new(dec!(10.00));
        assert_eq!(unit * 3, Balance::new(dec!(30.00)));
        let unit = Balance::new(dec!(0.33));
        assert_eq!((unit * 7).value(), dec!(2.31));
    }

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert_eq!(
            Amount::new(dec!(0.0)),
            Err(ValidationError::NonPositiveAmount)
        );
        assert_eq!(
            Amount::new(dec!(-1.0)),
            Err(ValidationError::NonPositiveAmount)
        );
        // rounds to zero
        assert!(Amount::new(dec!(0.001)).is_err());
    }

    #[test]
    fn test_display_two_places() {
        assert_eq!(Balance::new(dec!(30)).to_string(), "30.00");
        assert_eq!(Amount::new(dec!(15.5)).unwrap().to_string(), "15.50");
    }
}
