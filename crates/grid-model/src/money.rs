//! Fixed-point monetary amounts
//!
//! Prices are held as integer cents so sums stay exact; rounding happens once,
//! when a value enters the system or when an average is produced.

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

/// Monetary amount in cents
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Money(i64);

impl Money {
    /// Zero amount
    pub const ZERO: Money = Money(0);

    /// Create from cents
    #[inline]
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Cents value
    #[inline]
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Round a decimal value to the nearest cent
    ///
    /// Returns `None` for NaN, infinities and values outside the cent range.
    #[must_use]
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let cents = (value * 100.0).round();
        if cents.abs() >= 9.0e15 {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)]
        Some(Self(cents as i64))
    }

    /// Multiply by a whole quantity
    #[inline]
    #[must_use]
    pub fn times(self, quantity: u64) -> i128 {
        i128::from(self.0) * i128::from(quantity)
    }

    /// Clamp a wide cent sum back into range
    #[must_use]
    pub fn saturating_from_wide(cents: i128) -> Self {
        Self(i64::try_from(cents).unwrap_or(if cents < 0 { i64::MIN } else { i64::MAX }))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl std::str::FromStr for Money {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<f64>()
            .ok()
            .and_then(Self::from_decimal)
            .ok_or_else(|| ParseError::NotANumber(s.to_string()))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_always_two_decimals() {
        assert_eq!(Money::from_cents(12_000).to_string(), "120.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-250).to_string(), "-2.50");
    }

    #[test]
    fn parse_rounds_to_cents() {
        assert_eq!("120".parse::<Money>().unwrap(), Money::from_cents(12_000));
        assert_eq!("19.999".parse::<Money>().unwrap(), Money::from_cents(2_000));
        assert_eq!(" 3.1 ".parse::<Money>().unwrap(), Money::from_cents(310));
    }

    #[test]
    fn parse_rejects_non_numbers() {
        assert!("abc".parse::<Money>().is_err());
        assert!("NaN".parse::<Money>().is_err());
        assert!("inf".parse::<Money>().is_err());
    }

    #[test]
    fn wide_products_saturate() {
        let big = Money::from_cents(i64::MAX);
        assert_eq!(Money::saturating_from_wide(big.times(3)), Money::from_cents(i64::MAX));
    }

    proptest::proptest! {
        #[test]
        fn display_parses_back_to_the_same_cents(cents in -1_000_000_000_i64..1_000_000_000) {
            let money = Money::from_cents(cents);
            proptest::prop_assert_eq!(money.to_string().parse::<Money>().unwrap(), money);
        }
    }
}
