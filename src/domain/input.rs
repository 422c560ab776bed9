//! Parsing of free-text buyer input into validated values.

use crate::domain::money::Amount;
use crate::error::ValidationError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::str::FromStr;

/// Parses a quantity typed by the buyer.
///
/// Rejections are distinguishable: text that is not a number at all, a
/// number with a fractional part, zero or negative, and above `max`.
pub fn parse_quantity(raw: &str, max: u32) -> Result<u32, ValidationError> {
    let raw = raw.trim();
    let value = Decimal::from_str(raw).map_err(|_| out_of_range(raw, max))?;
    if !value.fract().is_zero() {
        return Err(ValidationError::NotAWholeNumber);
    }
    if value <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveQuantity);
    }
    if value > Decimal::from(max) {
        return Err(ValidationError::ExceedsMaximum { max });
    }
    value.to_u32().ok_or(ValidationError::ExceedsMaximum { max })
}

/// Classifies a numeral `Decimal` cannot hold by its sign; anything else is
/// not a number at all.
fn out_of_range(raw: &str, max: u32) -> ValidationError {
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    let is_numeral = !whole.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit());
    match (is_numeral, negative) {
        (false, _) => ValidationError::NotANumber,
        (true, true) => ValidationError::NonPositiveQuantity,
        (true, false) => ValidationError::ExceedsMaximum { max },
    }
}

/// Parses a top-up amount, rounding to two decimal places.
pub fn parse_amount(raw: &str) -> Result<Amount, ValidationError> {
    let value = Decimal::from_str(raw.trim()).map_err(|_| ValidationError::InvalidAmount)?;
    Amount::new(value)
}
