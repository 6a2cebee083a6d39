//! Helpers for storing monetary decimals.
//!
//! SQLite has no decimal type, amounts and rates are stored as TEXT so that
//! they are read back exactly as they were written.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use rusqlite::{Row, types::Type};

/// The number of decimal places kept for amounts and totals.
pub const MONEY_DECIMAL_PLACES: u32 = 2;

/// Round `amount` to [MONEY_DECIMAL_PLACES], rounding halves away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Read the TEXT column `index` as a decimal.
pub(crate) fn get_decimal(row: &Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let text: String = row.get(index)?;

    parse_decimal_column(&text, index)
}

/// Read the nullable TEXT column `index` as a decimal.
pub(crate) fn get_optional_decimal(
    row: &Row,
    index: usize,
) -> Result<Option<Decimal>, rusqlite::Error> {
    let text: Option<String> = row.get(index)?;

    text.map(|text| parse_decimal_column(&text, index))
        .transpose()
}

fn parse_decimal_column(text: &str, index: usize) -> Result<Decimal, rusqlite::Error> {
    Decimal::from_str(text).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}
