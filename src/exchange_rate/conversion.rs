//! Converts foreign currency amounts into the local currency.

use rusqlite::Connection;
use rust_decimal::Decimal;
use time::Date;

use crate::{
    Error,
    exchange_rate::{CurrencyCode, LocalCurrency, find_rate_as_of},
    money::round_money,
};

/// The outcome of converting an amount into the local currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    /// The rate used, one for the local currency.
    pub rate: Decimal,
    /// The converted amount rounded to two decimal places.
    pub local_total: Decimal,
}

/// Convert `amount` of `currency` into the local currency with the rate known on `date`.
///
/// Amounts already in the local currency are returned unchanged. Returns
/// `None` if no rate was stored for `currency` on or before `date`, or if
/// the product does not fit in a decimal.
pub fn convert_to_local(
    amount: Decimal,
    currency: &CurrencyCode,
    date: Date,
    local_currency: &LocalCurrency,
    connection: &Connection,
) -> Result<Option<Conversion>, Error> {
    if local_currency.matches(currency) {
        return Ok(Some(Conversion {
            rate: Decimal::ONE,
            local_total: amount,
        }));
    }

    let Some(rate) = find_rate_as_of(currency, date, connection)? else {
        tracing::debug!("No {currency} rate on or before {date}");
        return Ok(None);
    };

    let conversion = amount
        .checked_mul(rate)
        .map(|product| Conversion {
            rate,
            local_total: round_money(product),
        });

    if conversion.is_none() {
        tracing::warn!("Converting {amount} {currency} at {rate} overflowed");
    }

    Ok(conversion)
}
