//! Currency codes and the local currency that totals are converted into.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::Error;

/// An upper-case currency code of two to five ASCII letters, e.g. "USD" or "TL".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Validate and normalise a currency code.
    ///
    /// Surrounding whitespace is removed and letters are converted to upper case.
    ///
    /// # Errors
    /// Returns [Error::InvalidCurrency] if `code` is not two to five ASCII letters.
    pub fn new(code: &str) -> Result<Self, Error> {
        let trimmed = code.trim();

        if (2..=5).contains(&trimmed.len()) && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(trimmed.to_ascii_uppercase()))
        } else {
            Err(Error::InvalidCurrency(code.to_owned()))
        }
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CurrencyCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CurrencyCode::new(s)
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for CurrencyCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let code = String::deserialize(deserializer)?;

        CurrencyCode::new(&code).map_err(serde::de::Error::custom)
    }
}

impl ToSql for CurrencyCode {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for CurrencyCode {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// The currency that every transaction total is expressed in.
///
/// Amounts in the local currency are never converted, and the local currency
/// is never stored in the rate table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCurrency {
    /// The canonical code, e.g. "TRY".
    pub code: CurrencyCode,
    /// Other codes that also mean the local currency, e.g. "TL".
    pub aliases: Vec<CurrencyCode>,
}

impl LocalCurrency {
    /// Whether `currency` is the local currency or one of its aliases.
    pub fn matches(&self, currency: &CurrencyCode) -> bool {
        self.code == *currency || self.aliases.contains(currency)
    }
}

impl Default for LocalCurrency {
    /// Turkish lira, also written "TL".
    fn default() -> Self {
        Self {
            code: CurrencyCode("TRY".to_owned()),
            aliases: vec![CurrencyCode("TL".to_owned())],
        }
    }
}
