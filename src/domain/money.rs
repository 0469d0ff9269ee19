//! Fixed-point money: precision 20, scale 3, round-half-even.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

/// Scale (fractional digits) all `Money` values are rounded to.
pub const SCALE: u32 = 3;

/// A monetary amount, always rounded to [`SCALE`] fractional digits using
/// round-half-even. Wraps [`Decimal`] rather than re-deriving arithmetic from
/// scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Money(round_half_even(amount))
    }

    pub fn from_i64(amount: i64) -> Self {
        Money::new(Decimal::new(amount, 0))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

fn round_half_even(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointNearestEven)
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money::new(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money::new(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;
    fn mul(self, rhs: Decimal) -> Money {
        Money::new(self.0 * rhs)
    }
}

impl Div<Decimal> for Money {
    type Output = Money;
    fn div(self, rhs: Decimal) -> Money {
        Money::new(self.0 / rhs)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.*}", SCALE as usize, self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Money::new(Decimal::from_str(s)?))
    }
}

/// Serializes as the canonical `d.ddd` wire string, never a float.
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Money::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_to_three_fractional_digits() {
        let m = Money::new(dec!(1.23456));
        assert_eq!(m.as_decimal(), dec!(1.235));
    }

    #[test]
    fn rounds_half_to_even() {
        assert_eq!(Money::new(dec!(1.2345)).as_decimal(), dec!(1.234));
        assert_eq!(Money::new(dec!(1.2355)).as_decimal(), dec!(1.236));
    }

    #[test]
    fn division_rounds_half_even() {
        let m = Money::from_i64(10) / dec!(3);
        assert_eq!(m.as_decimal(), dec!(3.333));
    }

    #[test]
    fn display_is_canonical_three_digit_string() {
        assert_eq!(Money::from_i64(5).to_string(), "5.000");
    }

    #[test]
    fn wire_round_trip_is_string_not_float() {
        let m = Money::new(dec!(12.5));
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "\"12.500\"");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn arithmetic_rounds_each_step() {
        let a = Money::from_i64(1);
        let b = Money::new(dec!(0.0004));
        assert_eq!((a + b).as_decimal(), dec!(1.000));
    }
}
