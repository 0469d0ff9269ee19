//! Currencies and the conversion rates that connect them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::money::Money;

/// The closed set of currencies this ledger understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurrencyCode {
    UAH,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    pub const ALL: [CurrencyCode; 4] = [
        CurrencyCode::UAH,
        CurrencyCode::USD,
        CurrencyCode::EUR,
        CurrencyCode::GBP,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CurrencyCode::UAH => "UAH",
            CurrencyCode::USD => "USD",
            CurrencyCode::EUR => "EUR",
            CurrencyCode::GBP => "GBP",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = UnknownCurrencyCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UAH" => Ok(CurrencyCode::UAH),
            "USD" => Ok(CurrencyCode::USD),
            "EUR" => Ok(CurrencyCode::EUR),
            "GBP" => Ok(CurrencyCode::GBP),
            other => Err(UnknownCurrencyCode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown currency code: {0}")]
pub struct UnknownCurrencyCode(pub String);

/// A row in the `Currency` table: an opaque id bound to a [`CurrencyCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub id: i64,
    pub code: CurrencyCode,
}

/// A directed conversion edge: 1 unit of `from` is worth `rate` units of `to`.
/// If `allow_reversed`, the graph also carries the implicit `to -> from` edge
/// weighted `1 / rate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionRate {
    pub from_currency: i64,
    pub to_currency: i64,
    pub rate: Decimal,
    pub allow_reversed: bool,
}

impl ConversionRate {
    pub fn new(from_currency: i64, to_currency: i64, rate: Decimal, allow_reversed: bool) -> Self {
        Self {
            from_currency,
            to_currency,
            rate,
            allow_reversed,
        }
    }

    pub fn apply(&self, amount: Money) -> Money {
        amount * self.rate
    }
}
