//! This modules defines the common functionality for searching, sorting and
//! paging lists of records.

use serde::{Deserialize, Serialize};

use crate::name::fold_case;

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The number of items to return when a request does not specify a limit.
    pub default_limit: u64,
    /// The largest number of items a single request may ask for.
    pub max_limit: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 1000,
        }
    }
}

/// The order to sort records in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum SortOrder {
    /// Sort in order of increasing value.
    #[default]
    Ascending,
    /// Sort in order of decreasing value.
    Descending,
}

impl SortOrder {
    /// Parse the `sort_order` query parameter.
    ///
    /// Only "desc" (in any letter case) sorts in descending order, any other
    /// value sorts in ascending order.
    pub(crate) fn from_param(param: Option<&str>) -> Self {
        match param {
            Some(order) if order.trim().eq_ignore_ascii_case("desc") => SortOrder::Descending,
            _ => SortOrder::Ascending,
        }
    }

    pub(crate) fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// A whitelisted column that a list of records can be sorted by.
///
/// Implementors map request parameters onto SQL expressions so that user
/// input never ends up in a query string.
pub(crate) trait SortColumn: Sized + Default {
    /// Match the `sort_by` query parameter against the allowed columns.
    fn from_param(param: &str) -> Option<Self>;

    /// The SQL expression to order by.
    fn as_sql(&self) -> &'static str;
}

/// The query parameters accepted by the list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Case-insensitive substring to search for.
    #[serde(default)]
    pub search: Option<String>,
    /// The number of matching records to skip.
    #[serde(default)]
    pub skip: Option<u64>,
    /// The maximum number of records to return.
    #[serde(default)]
    pub limit: Option<u64>,
    /// The column to sort by.
    #[serde(default)]
    pub sort_by: Option<String>,
    /// "asc" or "desc".
    #[serde(default)]
    pub sort_order: Option<String>,
}

/// A validated list request.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ListQuery<C> {
    /// The case folded search string, `None` when the search string is empty.
    pub search: Option<String>,
    pub offset: u64,
    pub limit: u64,
    pub sort_column: C,
    pub sort_order: SortOrder,
}

impl<C: SortColumn> ListQuery<C> {
    /// Validate the request parameters.
    ///
    /// An unrecognised sort column silently falls back to the column's default,
    /// the limit is clamped to `1..=config.max_limit`.
    pub(crate) fn from_params(params: ListParams, config: &PaginationConfig) -> Self {
        let search = params
            .search
            .map(|search| fold_case(search.trim()))
            .filter(|search| !search.is_empty());

        let sort_column = params
            .sort_by
            .as_deref()
            .and_then(|sort_by| {
                let column = C::from_param(sort_by.trim());
                if column.is_none() {
                    tracing::debug!("Unknown sort column {sort_by:?}, falling back to default");
                }
                column
            })
            .unwrap_or_default();

        Self {
            search,
            offset: params.skip.unwrap_or(0),
            limit: params
                .limit
                .unwrap_or(config.default_limit)
                .clamp(1, config.max_limit.max(1)),
            sort_column,
            sort_order: SortOrder::from_param(params.sort_order.as_deref()),
        }
    }

    /// The ORDER BY clause, with the `id_column` as a tie breaker to keep pages stable.
    pub(crate) fn order_by_clause(&self, id_column: &str) -> String {
        format!(
            "ORDER BY {} {}, {id_column} ASC",
            self.sort_column.as_sql(),
            self.sort_order.as_sql()
        )
    }

    /// SQLite takes signed integers for LIMIT and OFFSET.
    pub(crate) fn limit_and_offset(&self) -> (i64, i64) {
        (
            i64::try_from(self.limit).unwrap_or(i64::MAX),
            i64::try_from(self.offset).unwrap_or(i64::MAX),
        )
    }
}

/// One page of records together with the number of records matching the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The number of records that matched the query before paging.
    pub total: u64,
    /// The records on the requested page.
    pub items: Vec<T>,
}
