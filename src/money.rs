// 💵 Money - fixed-point currency amounts
// Balances and transfer amounts are integer minor units (cents), never f64

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of decimal places carried by every amount
pub const CURRENCY_SCALE: u32 = 2;

const MINOR_PER_MAJOR: i64 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("not a decimal amount: {0:?}")]
    Malformed(String),

    #[error("amount {0} has more than two decimal places")]
    TooPrecise(String),

    #[error("amount {0} is out of range")]
    OutOfRange(String),
}

/// Currency amount in minor units (1 = one cent)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_minor_units(minor: i64) -> Self {
        Amount(minor)
    }

    /// Whole currency units, e.g. `Amount::from_major(1500)` is 1500.00
    pub fn from_major(major: i64) -> Option<Self> {
        major.checked_mul(MINOR_PER_MAJOR).map(Amount)
    }

    pub const fn minor_units(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Convert an exact decimal. Values needing more than two places are
    /// rejected instead of rounded.
    pub fn from_decimal(value: Decimal) -> Result<Self, AmountError> {
        let normalized = value.normalize();
        if normalized.scale() > CURRENCY_SCALE {
            return Err(AmountError::TooPrecise(value.to_string()));
        }
        normalized
            .checked_mul(Decimal::from(MINOR_PER_MAJOR))
            .and_then(|minor| minor.to_i64())
            .map(Amount)
            .ok_or_else(|| AmountError::OutOfRange(value.to_string()))
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, CURRENCY_SCALE)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Accepts `500`, `500.5`, `1,500.00` and a leading `$`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let unsigned = trimmed.strip_prefix('$').unwrap_or(trimmed);
        let digits =
            strip_thousands(unsigned).ok_or_else(|| AmountError::Malformed(s.to_string()))?;
        let value =
            Decimal::from_str(&digits).map_err(|_| AmountError::Malformed(s.to_string()))?;
        Amount::from_decimal(value)
    }
}

/// Remove thousands separators, `None` when commas are misplaced.
///
/// Commas may only appear in the integer part, grouping it by threes.
fn strip_thousands(raw: &str) -> Option<String> {
    if !raw.contains(',') {
        return Some(raw.to_string());
    }

    let (integer, fraction) = match raw.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (raw, None),
    };
    if fraction.is_some_and(|f| f.contains(',')) {
        return None;
    }

    let unsigned = integer.strip_prefix('-').unwrap_or(integer);
    let mut groups = unsigned.split(',');
    let leading = groups.next()?;
    if leading.is_empty() || leading.len() > 3 {
        return None;
    }
    if !groups.all(|g| g.len() == 3) {
        return None;
    }

    Some(raw.replace(',', ""))
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let amount: Amount = "1500.00".parse().unwrap();
        assert_eq!(amount.minor_units(), 150_000);
        assert_eq!(amount.to_string(), "1500.00");

        let amount: Amount = "$500".parse().unwrap();
        assert_eq!(amount.minor_units(), 50_000);
        assert_eq!(amount.to_string(), "500.00");

        let amount: Amount = "0.1".parse().unwrap();
        assert_eq!(amount.minor_units(), 10);
        assert_eq!(amount.to_string(), "0.10");

        let amount: Amount = "1,234.56".parse().unwrap();
        assert_eq!(amount.minor_units(), 123_456);
    }

    #[test]
    fn test_trailing_zeros_are_not_extra_precision() {
        let amount: Amount = "12.3400".parse().unwrap();
        assert_eq!(amount.minor_units(), 1234);
    }

    #[test]
    fn test_rejects_sub_cent_amounts() {
        let result = "0.005".parse::<Amount>();
        assert!(matches!(result, Err(AmountError::TooPrecise(_))));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!("abc".parse::<Amount>(), Err(AmountError::Malformed(_))));
        assert!(matches!("".parse::<Amount>(), Err(AmountError::Malformed(_))));
    }

    #[test]
    fn test_negative_amounts_parse() {
        let amount: Amount = "-20.00".parse().unwrap();
        assert!(amount.is_negative());
        assert!(!amount.is_positive());
        assert_eq!(amount.to_string(), "-20.00");
    }

    #[test]
    fn test_no_float_drift() {
        // 0.1 + 0.2 is exactly 0.30 in minor units
        let a: Amount = "0.10".parse().unwrap();
        let b: Amount = "0.20".parse().unwrap();
        assert_eq!(a.checked_add(b).unwrap().to_string(), "0.30");
    }

    #[test]
    fn test_checked_arithmetic() {
        let max = Amount::from_minor_units(i64::MAX);
        assert!(max.checked_add(Amount::from_minor_units(1)).is_none());
        assert!(Amount::from_major(i64::MAX).is_none());
    }

    #[test]
    fn test_rejects_out_of_range() {
        for huge in [
            "79228162514264337593543950335",
            "1000000000000000000000000000",
            "92233720368547758.08",
        ] {
            assert!(
                matches!(huge.parse::<Amount>(), Err(AmountError::OutOfRange(_))),
                "{} should be out of range",
                huge
            );
        }

        let largest: Amount = "92233720368547758.07".parse().unwrap();
        assert_eq!(largest.minor_units(), i64::MAX);
    }

    #[test]
    fn test_thousands_separators() {
        assert_eq!("1,234,567.89".parse::<Amount>().unwrap().minor_units(), 123_456_789);
        assert_eq!("-1,000".parse::<Amount>().unwrap().minor_units(), -100_000);
        assert_eq!("$12,000.50".parse::<Amount>().unwrap().minor_units(), 1_200_050);

        for bad in ["1,2,3", ",100", "1,00", "1000,000", "1,000.0,0", "1,", "1234,567"] {
            assert!(
                matches!(bad.parse::<Amount>(), Err(AmountError::Malformed(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_serde_as_decimal_string() {
        let amount = Amount::from_minor_units(50_000);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"500.00\"");

        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
    }
}
