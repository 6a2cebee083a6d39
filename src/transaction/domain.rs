//! Core transaction domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    category::{CategoryId, EntryType},
    exchange_rate::CurrencyCode,
    money::round_money,
    pagination::SortColumn,
    project::ProjectId,
};

/// Database identifier for a transaction.
pub type TransactionId = i64;

/// An income or expense booked against a project and a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    #[serde(rename = "type")]
    pub kind: EntryType,
    pub project_id: ProjectId,
    pub project_name: String,
    pub category_id: CategoryId,
    pub category_name: String,
    /// When the money changed hands.
    pub date: Date,
    /// The amount in `currency`, rounded to two decimal places.
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub description: Option<String>,
    /// The amount in the local currency, `None` if no exchange rate was known
    /// on or before `date` when the transaction was last saved.
    #[serde(serialize_with = "rust_decimal::serde::float_option::serialize")]
    pub local_total: Option<Decimal>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Request body for creating and updating a transaction.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionData {
    #[serde(rename = "type")]
    pub kind: String,
    pub project_id: ProjectId,
    pub category_id: CategoryId,
    pub date: Date,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A transaction whose fields have been validated, ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub kind: EntryType,
    pub project_id: ProjectId,
    pub category_id: CategoryId,
    pub date: Date,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub description: Option<String>,
}

impl TryFrom<TransactionData> for NewTransaction {
    type Error = Error;

    /// Validate the type and currency, round the amount to two decimal places
    /// and drop a blank description.
    ///
    /// Whether the project and category exist is checked when the transaction is saved.
    fn try_from(data: TransactionData) -> Result<Self, Self::Error> {
        let description = data
            .description
            .map(|description| description.trim().to_owned())
            .filter(|description| !description.is_empty());

        Ok(Self {
            kind: data.kind.parse()?,
            project_id: data.project_id,
            category_id: data.category_id,
            date: data.date,
            amount: round_money(data.amount),
            currency: CurrencyCode::new(&data.currency)?,
            description,
        })
    }
}

/// The columns a transaction list can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum TransactionSortColumn {
    #[default]
    Id,
    Type,
    ProjectName,
    CategoryName,
    Date,
    Amount,
    Currency,
    CreatedAt,
    LocalTotal,
}

impl SortColumn for TransactionSortColumn {
    fn from_param(param: &str) -> Option<Self> {
        match param {
            "id" => Some(Self::Id),
            "type" => Some(Self::Type),
            "project_name" => Some(Self::ProjectName),
            "category_name" => Some(Self::CategoryName),
            "date" => Some(Self::Date),
            "amount" => Some(Self::Amount),
            "currency" => Some(Self::Currency),
            "created_at" => Some(Self::CreatedAt),
            "local_total" | "tl_total" => Some(Self::LocalTotal),
            _ => None,
        }
    }

    // Money is stored as TEXT, cast so that it sorts numerically.
    fn as_sql(&self) -> &'static str {
        match self {
            Self::Id => "t.id",
            Self::Type => "t.type",
            Self::ProjectName => "p.name",
            Self::CategoryName => "c.name",
            Self::Date => "t.date",
            Self::Amount => "CAST(t.amount AS REAL)",
            Self::Currency => "t.currency",
            Self::CreatedAt => "t.created_at",
            Self::LocalTotal => "CAST(t.local_total AS REAL)",
        }
    }
}
