//! The stored daily exchange rates.

use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    exchange_rate::CurrencyCode,
    money::get_decimal,
    pagination::Page,
};

/// The rate of one unit of `currency` in the local currency on `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeRate {
    pub id: i64,
    pub currency: CurrencyCode,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub rate: Decimal,
    pub date: Date,
}

/// Insert the rate for `currency` on `date`, or replace the stored rate if
/// there is one already.
pub fn upsert_exchange_rate(
    currency: &CurrencyCode,
    rate: Decimal,
    date: Date,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO exchange_rate (currency, rate, date) VALUES (?1, ?2, ?3)
         ON CONFLICT(currency, date) DO UPDATE SET rate = excluded.rate",
        params![currency, rate.to_string(), date],
    )?;

    Ok(())
}

/// Retrieve a page of stored rates, newest first, optionally for one currency.
pub fn list_exchange_rates(
    currency: Option<&CurrencyCode>,
    limit: u64,
    offset: u64,
    connection: &Connection,
) -> Result<Page<ExchangeRate>, Error> {
    const FILTER: &str = "WHERE (?1 IS NULL OR currency = ?1)";

    let total: i64 = connection.query_row(
        &format!("SELECT COUNT(id) FROM exchange_rate {FILTER}"),
        params![currency],
        |row| row.get(0),
    )?;

    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let offset = i64::try_from(offset).unwrap_or(i64::MAX);

    let items = connection
        .prepare(&format!(
            "SELECT id, currency, rate, date FROM exchange_rate {FILTER}
             ORDER BY date DESC, currency ASC LIMIT ?2 OFFSET ?3"
        ))?
        .query_map(params![currency, limit, offset], map_row)?
        .map(|maybe_rate| maybe_rate.map_err(Error::from))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        total: total as u64,
        items,
    })
}

/// Find the stored rate for `currency` with the latest date on or before `date`.
///
/// Returns `None` if there is no such rate, or if the stored rate cannot be
/// read as a decimal.
pub fn find_rate_as_of(
    currency: &CurrencyCode,
    date: Date,
    connection: &Connection,
) -> Result<Option<Decimal>, Error> {
    let stored: Option<(String, Date)> = connection
        .query_row(
            "SELECT rate, date FROM exchange_rate
             WHERE currency = ?1 AND date <= ?2
             ORDER BY date DESC LIMIT 1",
            params![currency, date],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    Ok(stored.and_then(|(raw_rate, rate_date)| {
        raw_rate
            .parse::<Decimal>()
            .inspect_err(|error| {
                tracing::warn!("Ignoring malformed {currency} rate {raw_rate:?} on {rate_date}: {error}")
            })
            .ok()
    }))
}

/// Initialize the exchange rate table.
///
/// There is at most one rate per currency and day.
pub fn create_exchange_rate_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS exchange_rate (
            id INTEGER PRIMARY KEY,
            currency TEXT NOT NULL COLLATE NOCASE,
            rate TEXT NOT NULL,
            date TEXT NOT NULL,
            UNIQUE(currency, date)
        )",
        (),
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<ExchangeRate, rusqlite::Error> {
    Ok(ExchangeRate {
        id: row.get(0)?,
        currency: row.get(1)?,
        rate: get_decimal(row, 2)?,
        date: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rusqlite::{Connection, params};
    use rust_decimal::Decimal;
    use time::macros::date;

    use crate::{db::initialize, exchange_rate::CurrencyCode};

    use super::{find_rate_as_of, list_exchange_rates, upsert_exchange_rate};

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    fn usd() -> CurrencyCode {
        CurrencyCode::new("USD").unwrap()
    }

    fn decimal(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap()
    }

    #[test]
    fn upsert_keeps_one_row_with_latest_rate() {
        let connection = get_test_connection();
        let day = date!(2024 - 01 - 15);

        upsert_exchange_rate(&usd(), decimal("27.50"), day, &connection).unwrap();
        upsert_exchange_rate(&usd(), decimal("27.95"), day, &connection).unwrap();

        let page = list_exchange_rates(None, 10, 0, &connection).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].rate, decimal("27.95"));
    }

    #[test]
    fn second_row_for_same_day_is_rejected() {
        let connection = get_test_connection();
        let day = date!(2024 - 01 - 15);
        upsert_exchange_rate(&usd(), decimal("27.50"), day, &connection).unwrap();

        let result = connection.execute(
            "INSERT INTO exchange_rate (currency, rate, date) VALUES (?1, ?2, ?3)",
            params!["usd", "1.0", day],
        );

        assert!(result.is_err());
    }

    #[test]
    fn finds_latest_rate_on_or_before_date() {
        let connection = get_test_connection();
        upsert_exchange_rate(&usd(), decimal("27.00"), date!(2024 - 01 - 10), &connection)
            .unwrap();
        upsert_exchange_rate(&usd(), decimal("27.50"), date!(2024 - 01 - 12), &connection)
            .unwrap();
        upsert_exchange_rate(&usd(), decimal("28.00"), date!(2024 - 01 - 20), &connection)
            .unwrap();

        assert_eq!(
            find_rate_as_of(&usd(), date!(2024 - 01 - 12), &connection),
            Ok(Some(decimal("27.50")))
        );
        assert_eq!(
            find_rate_as_of(&usd(), date!(2024 - 01 - 15), &connection),
            Ok(Some(decimal("27.50")))
        );
        assert_eq!(
            find_rate_as_of(&usd(), date!(2024 - 01 - 09), &connection),
            Ok(None)
        );
    }

    #[test]
    fn malformed_stored_rate_is_unavailable() {
        let connection = get_test_connection();
        connection
            .execute(
                "INSERT INTO exchange_rate (currency, rate, date) VALUES ('USD', 'n/a', ?1)",
                [date!(2024 - 01 - 10)],
            )
            .unwrap();

        assert_eq!(
            find_rate_as_of(&usd(), date!(2024 - 01 - 10), &connection),
            Ok(None)
        );
    }

    #[test]
    fn lists_newest_first_filtered_by_currency() {
        let connection = get_test_connection();
        let eur = CurrencyCode::new("EUR").unwrap();
        upsert_exchange_rate(&usd(), decimal("27"), date!(2024 - 01 - 10), &connection).unwrap();
        upsert_exchange_rate(&usd(), decimal("28"), date!(2024 - 01 - 11), &connection).unwrap();
        upsert_exchange_rate(&eur, decimal("30"), date!(2024 - 01 - 11), &connection).unwrap();

        let page = list_exchange_rates(Some(&usd()), 10, 0, &connection).unwrap();

        let dates: Vec<_> = page.items.iter().map(|rate| rate.date).collect();
        assert_eq!(page.total, 2);
        assert_eq!(dates, [date!(2024 - 01 - 11), date!(2024 - 01 - 10)]);
    }
}
