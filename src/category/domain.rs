//! Core category domain types.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, name::Name, pagination::SortColumn};

/// Database identifier for a category.
pub type CategoryId = i64;

/// Whether money comes in or goes out.
///
/// Stored and sent over the wire with the Turkish names used by the
/// bookkeeping department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    /// Income ("gelir").
    #[serde(rename = "gelir")]
    Income,
    /// Expense ("gider").
    #[serde(rename = "gider")]
    Expense,
}

impl EntryType {
    /// The name stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Income => "gelir",
            EntryType::Expense => "gider",
        }
    }
}

impl FromStr for EntryType {
    type Err = Error;

    /// Parse an entry type, ignoring surrounding whitespace and letter case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        if trimmed.eq_ignore_ascii_case("gelir") {
            Ok(EntryType::Income)
        } else if trimmed.eq_ignore_ascii_case("gider") {
            Ok(EntryType::Expense)
        } else {
            Err(Error::InvalidEntryType(s.to_owned()))
        }
    }
}

impl Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for EntryType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for EntryType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// A category of income or expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    #[serde(rename = "type")]
    pub kind: EntryType,
    /// Unique among categories of the same type, ignoring letter case.
    pub name: Name,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Request body for creating and updating a category.
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryData {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

/// The columns a category list can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum CategorySortColumn {
    #[default]
    Id,
    Type,
    Name,
    CreatedAt,
}

impl SortColumn for CategorySortColumn {
    fn from_param(param: &str) -> Option<Self> {
        match param {
            "id" => Some(Self::Id),
            "type" => Some(Self::Type),
            "name" => Some(Self::Name),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn as_sql(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Type => "type",
            Self::Name => "name",
            Self::CreatedAt => "created_at",
        }
    }
}
