use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;
use thiserror::Error;

pub type Cents = i64;

/// 2^63 as a float: the first cent value outside the `i64` range.
const CENTS_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// An amount of money in minor units. Always rendered with two decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money {
    cents: Cents,
}

impl Money {
    pub const ZERO: Money = Money { cents: 0 };

    pub const fn from_cents(cents: Cents) -> Self {
        Money { cents }
    }

    pub const fn from_units(units: i64) -> Self {
        Money { cents: units * 100 }
    }

    /// `None` when the amount does not fit in cents.
    pub fn checked_from_units(units: i64) -> Option<Self> {
        units.checked_mul(100).map(Money::from_cents)
    }

    pub fn cents(&self) -> Cents {
        self.cents
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Subtraction floored at zero.
    pub fn saturating_sub(self, other: Money) -> Money {
        Money { cents: self.cents.saturating_sub(other.cents).max(0) }
    }

    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    pub fn times(self, quantity: u32) -> Money {
        Money { cents: self.cents.saturating_mul(i64::from(quantity)) }
    }

    /// `self * rate / 100`, where `rate` is itself a two-decimal amount
    /// (so `Money::from_units(10)` is ten percent). Rounds half away from zero.
    pub fn percent(self, rate: Money) -> Money {
        let product = i128::from(self.cents) * i128::from(rate.cents);
        let rounded = (product + product.signum() * 5_000) / 10_000;
        let cents = i64::try_from(rounded).unwrap_or(if rounded < 0 { i64::MIN } else { i64::MAX });
        Money { cents }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid amount format: {0}")]
    InvalidFormat(String),

    #[error("Amount has more than two decimals: {0}")]
    TooPrecise(String),
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Self) -> Self::Output {
        Money { cents: self.cents.saturating_add(other.cents) }
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(MoneyError::InvalidFormat(s.to_string()));
        }
        if fraction.len() > 2 {
            return Err(MoneyError::TooPrecise(s.to_string()));
        }

        let units = whole.parse::<i64>()
            .map_err(|_| MoneyError::InvalidFormat(s.to_string()))?;
        let minor = format!("{:0<2}", fraction).parse::<i64>()
            .map_err(|_| MoneyError::InvalidFormat(s.to_string()))?;
        let cents = units
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(|| MoneyError::InvalidFormat(s.to_string()))?;

        Ok(Money { cents: if negative { -cents } else { cents } })
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Integer(i64),
            Number(f64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => Money::from_str(&text).map_err(serde::de::Error::custom),
            Repr::Integer(units) => Money::checked_from_units(units)
                .ok_or_else(|| serde::de::Error::custom(MoneyError::InvalidFormat(units.to_string()))),
            Repr::Number(value) => {
                let cents = (value * 100.0).round();
                if !cents.is_finite() || cents < -CENTS_BOUND || cents >= CENTS_BOUND {
                    return Err(serde::de::Error::custom(MoneyError::InvalidFormat(value.to_string())));
                }
                Ok(Money::from_cents(cents as i64))
            }
        }
    }
}
