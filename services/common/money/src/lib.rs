use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, Signed, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of decimal places every gateway amount carries.
pub const AMOUNT_SCALE: i64 = 2;

/// Largest number of digits allowed before the decimal point.
pub const MAX_INTEGER_DIGITS: i64 = 15;

/// Largest number of digits allowed after the decimal point.
pub const MAX_FRACTION_DIGITS: i64 = 18;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount is empty")]
    Empty,
    #[error("amount `{0}` is not a decimal number")]
    Invalid(String),
    #[error("amount is outside the supported range")]
    OutOfRange,
}

/// Normalize a monetary value to 2 decimal places, rounding half away from zero.
pub fn normalize_scale(value: &BigDecimal) -> BigDecimal {
    // with_scale truncates toward zero, so bias by half a cent first.
    let half_cent = BigDecimal::new(BigInt::from(5), AMOUNT_SCALE + 1);
    let biased = if value.is_negative() {
        value.clone() - half_cent
    } else {
        value.clone() + half_cent
    };
    biased.with_scale(AMOUNT_SCALE)
}

/// Render an amount the way the payment gateway expects it: exactly two
/// decimals, `.` separator, no grouping, independent of any locale.
pub fn format_amount(value: &BigDecimal) -> String {
    normalize_scale(value).to_string()
}

pub fn parse_amount(raw: &str) -> Result<BigDecimal, MoneyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MoneyError::Empty);
    }
    let value =
        BigDecimal::from_str(trimmed).map_err(|_| MoneyError::Invalid(trimmed.to_string()))?;
    ensure_in_range(&value)?;
    Ok(value)
}

/// Reject values whose exponent or digit count would make rescaling
/// expensive. Must run before comparing, rounding or formatting untrusted input.
pub fn ensure_in_range(value: &BigDecimal) -> Result<(), MoneyError> {
    let (digits, scale) = value.as_bigint_and_exponent();
    if !(-MAX_INTEGER_DIGITS..=MAX_FRACTION_DIGITS).contains(&scale) {
        return Err(MoneyError::OutOfRange);
    }
    // legal values carry at most 33 digits, well under 128 bits
    if digits.bits() > 128 {
        return Err(MoneyError::OutOfRange);
    }
    let digit_count = digits.to_string().trim_start_matches('-').len() as i64;
    if digit_count - scale > MAX_INTEGER_DIGITS {
        return Err(MoneyError::OutOfRange);
    }
    Ok(())
}

/// Compare two monetary values allowing a tolerance (in cents) after normalization.
pub fn nearly_equal(a: &BigDecimal, b: &BigDecimal, cents_tolerance: i64) -> bool {
    let na = normalize_scale(a);
    let nb = normalize_scale(b);
    let diff = (na - nb).with_scale(AMOUNT_SCALE);
    let cents = (diff * BigDecimal::from(100)).with_scale(0);
    cents
        .abs()
        .to_i64()
        .map(|c| c <= cents_tolerance)
        .unwrap_or(false)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedMoney(BigDecimal);

impl NormalizedMoney {
    pub fn new(raw: BigDecimal) -> Self {
        Self(normalize_scale(&raw))
    }
    pub fn inner(&self) -> &BigDecimal { &self.0 }
}

impl From<BigDecimal> for NormalizedMoney {
    fn from(value: BigDecimal) -> Self { Self::new(value) }
}

impl fmt::Display for NormalizedMoney {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_scale(&dec("12.3456")).to_string(), "12.35");
        assert_eq!(normalize_scale(&dec("12.3449")).to_string(), "12.34");
    }

    #[test]
    fn formats_fixed_two_decimals() {
        assert_eq!(format_amount(&dec("1234.5")), "1234.50");
        assert_eq!(format_amount(&dec("100")), "100.00");
        assert_eq!(format_amount(&dec("0")), "0.00");
        assert_eq!(format_amount(&dec("0.05")), "0.05");
    }

    #[test]
    fn midpoint_rounds_away_from_zero() {
        assert_eq!(format_amount(&dec("2.675")), "2.68");
        assert_eq!(format_amount(&dec("-2.675")), "-2.68");
        assert_eq!(format_amount(&dec("0.005")), "0.01");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_amount("  "), Err(MoneyError::Empty));
        assert!(matches!(parse_amount("12,50"), Err(MoneyError::Invalid(_))));
        assert_eq!(parse_amount(" 99.9 ").unwrap(), dec("99.9"));
    }

    #[test]
    fn huge_exponents_are_rejected_cheaply() {
        assert!(matches!(parse_amount("1e2000000"), Err(MoneyError::OutOfRange)));
        assert!(matches!(parse_amount("1e-2000000"), Err(MoneyError::OutOfRange)));
        assert!(matches!(parse_amount("1000000000000000"), Err(MoneyError::OutOfRange)));
        assert!(ensure_in_range(&dec("999999999999999.99")).is_ok());
        assert!(ensure_in_range(&dec("0.000000000000000001")).is_ok());
        assert!(ensure_in_range(&dec("0")).is_ok());
        assert!(ensure_in_range(&dec("-12.5")).is_ok());
    }

    #[test]
    fn test_nearly_equal() {
        let a = dec("10.001");
        let b = dec("10.009");
        assert!(nearly_equal(&a, &b, 1)); // 1 cent tolerance
        assert!(!nearly_equal(&dec("10.00"), &dec("10.05"), 1));
    }
}
