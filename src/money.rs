//! Fixed-point money amounts.
//!
//! Amounts are stored as a whole number of minor units (cents, centavos) so
//! that sums are exact no matter how many transactions are added up.

use std::{
    fmt::Display,
    ops::{Add, AddAssign, Sub},
};

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// The number of minor units in one major unit.
const MINOR_UNITS: i64 = 100;

/// The largest magnitude accepted when converting from a float, in major units.
///
/// At this size tens of millions of amounts can be added up before a total
/// leaves the range of an `i64`.
pub const MAX_MAJOR_UNITS: f64 = 1e9;

/// An amount of money in minor units.
///
/// Serialized as a decimal number of major units, e.g. `Money::from_minor_units(1250)`
/// is sent over the wire as `12.5`.
///
/// Arithmetic saturates at the bounds of `i64` instead of overflowing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "f64", try_from = "f64")]
pub struct Money(i64);

impl Money {
    /// Zero.
    pub const ZERO: Money = Money(0);

    /// Create an amount from a whole number of minor units.
    pub const fn from_minor_units(minor_units: i64) -> Self {
        Self(minor_units)
    }

    /// The amount as a whole number of minor units.
    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    /// Convert a decimal amount in major units, rounding to the nearest minor unit.
    ///
    /// Returns `None` for NaN, infinities and values too large to represent.
    pub fn from_major_units(amount: f64) -> Option<Self> {
        if !amount.is_finite() || amount.abs() > MAX_MAJOR_UNITS {
            return None;
        }

        Some(Self((amount * MINOR_UNITS as f64).round() as i64))
    }

    /// The amount in major units.
    pub fn as_major_units(&self) -> f64 {
        self.0 as f64 / MINOR_UNITS as f64
    }

    /// Parse user input as a strictly positive amount.
    ///
    /// Leading and trailing whitespace is ignored. Returns `None` if the text
    /// is not a number, is not finite, or is not greater than zero once
    /// rounded to minor units.
    pub fn parse_positive(text: &str) -> Option<Self> {
        let amount: f64 = text.trim().parse().ok()?;
        let money = Self::from_major_units(amount)?;

        (money.0 > 0).then_some(money)
    }

    /// Whether the amount is greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl Display for Money {
    /// Formats the amount with exactly two decimal places, e.g. "-12.30".
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let minor_units = MINOR_UNITS as u64;

        write!(
            f,
            "{sign}{}.{:02}",
            magnitude / minor_units,
            magnitude % minor_units
        )
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl From<Money> for f64 {
    fn from(value: Money) -> Self {
        value.as_major_units()
    }
}

/// The error returned when a float cannot be converted into [Money].
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("{0} is not a representable amount of money")]
pub struct InvalidAmount(f64);

impl TryFrom<f64> for Money {
    type Error = InvalidAmount;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Money::from_major_units(value).ok_or(InvalidAmount(value))
    }
}

impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_i64().map(Money)
    }
}
