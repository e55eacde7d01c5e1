//! # Exact Monetary Amounts
//!
//! `Amount` wraps `rust_decimal::Decimal`. Balances, transfer amounts and
//! every LP coefficient derived from them stay in exact decimal arithmetic;
//! conservation checks compare with `==`, never with an epsilon.
//!
//! Amounts are non-negative. Arithmetic is checked and reports overflow or
//! a negative result as an error instead of wrapping or saturating.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SecflowError;

/// A non-negative exact decimal amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a decimal.
    ///
    /// # Errors
    ///
    /// Rejects negative values.
    pub fn new(value: Decimal) -> Result<Self, SecflowError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(SecflowError::InvalidAmount(format!(
                "amount must be non-negative, got {value}"
            )));
        }
        Ok(Self(value.normalize()))
    }

    /// Create an amount from a whole number of units.
    pub fn from_units(units: u64) -> Self {
        Self(Decimal::from(units))
    }

    /// The underlying decimal.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checked addition.
    pub fn checked_add(&self, other: Amount) -> Result<Amount, SecflowError> {
        self.0
            .checked_add(other.0)
            .map(|v| Amount(v.normalize()))
            .ok_or_else(|| SecflowError::InvalidAmount(format!("overflow adding {other} to {self}")))
    }

    /// Checked subtraction; fails if the result would be negative.
    pub fn checked_sub(&self, other: Amount) -> Result<Amount, SecflowError> {
        let value = self
            .0
            .checked_sub(other.0)
            .ok_or_else(|| SecflowError::InvalidAmount(format!("overflow subtracting {other} from {self}")))?;
        Amount::new(value)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = SecflowError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl FromStr for Amount {
    type Err = SecflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| SecflowError::InvalidAmount(format!("cannot parse {s:?}: {e}")))?;
        Self::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_strings_exactly() {
        let a: Amount = "2500.00".parse().unwrap();
        assert_eq!(a, Amount::from_units(2500));
        assert_eq!(a.to_string(), "2500");
    }

    #[test]
    fn rejects_negative() {
        assert!("-1".parse::<Amount>().is_err());
        assert!(Amount::new(Decimal::new(-5, 1)).is_err());
    }

    #[test]
    fn zero_is_not_positive() {
        assert!(!Amount::ZERO.is_positive());
        assert!(Amount::from_units(1).is_positive());
    }

    #[test]
    fn tenths_add_exactly() {
        let tenth: Amount = "0.1".parse().unwrap();
        let two_tenths: Amount = "0.2".parse().unwrap();
        let sum = tenth.checked_add(two_tenths).unwrap();
        assert_eq!(sum, "0.3".parse::<Amount>().unwrap());
    }

    #[test]
    fn subtraction_below_zero_fails() {
        let small = Amount::from_units(100);
        let large = Amount::from_units(300);
        assert!(small.checked_sub(large).is_err());
        assert_eq!(large.checked_sub(small).unwrap(), Amount::from_units(200));
    }

    #[test]
    fn serde_rejects_negative() {
        assert!(serde_json::from_str::<Amount>("\"-3\"").is_err());
        let a: Amount = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(a.to_string(), "12.5");
    }
}
