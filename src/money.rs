//! Monetary amounts.
//!
//! Amounts are kept as [Decimal] everywhere inside the application and are only
//! converted to a floating point number when written to a JSON response.

use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};

use crate::Error;

/// A strictly positive amount of money in the owner's currency.
///
/// Whether the money was earned or spent is recorded separately, so an
/// `Amount` is never negative or zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(Decimal);

impl Amount {
    /// Create an amount from a decimal.
    ///
    /// # Errors
    /// Returns [Error::InvalidInput] for the field `amount` if `value` is not
    /// greater than zero.
    pub fn new(value: Decimal) -> Result<Self, Error> {
        if value <= Decimal::ZERO {
            return Err(Error::invalid_field("amount", "must be greater than zero"));
        }

        Ok(Self(value))
    }

    /// Create an amount from a number received from a client.
    ///
    /// The float is converted to the shortest decimal that represents it, so
    /// `0.1` becomes exactly `0.1`.
    ///
    /// # Errors
    /// Returns [Error::InvalidInput] for the field `amount` if `value` is NaN,
    /// infinite, too large to represent or not greater than zero.
    pub fn from_f64(value: f64) -> Result<Self, Error> {
        if !value.is_finite() {
            return Err(Error::invalid_field("amount", "must be a finite number"));
        }

        let decimal = Decimal::from_f64(value)
            .ok_or_else(|| Error::invalid_field("amount", "is too large"))?;

        Self::new(decimal)
    }

    /// The amount as a decimal.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Convert a decimal to the plain number sent to clients.
pub fn decimal_to_f64(value: Decimal) -> f64 {
    // `Decimal` always fits in an `f64`, albeit with rounding.
    value.to_f64().unwrap_or_default()
}

// Amounts are stored as text so that SQLite does not round them to a REAL.
impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let decimal = Decimal::from_str(value.as_str()?)
            .map_err(|error| FromSqlError::Other(Box::new(error)))?;

        if decimal <= Decimal::ZERO {
            return Err(FromSqlError::Other(
                format!("stored amount {decimal} is not positive").into(),
            ));
        }

        Ok(Self(decimal))
    }
}
