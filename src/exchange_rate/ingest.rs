//! Fetches rate sheets and stores their rates.

use std::sync::Mutex;

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, Duration};

use crate::{
    Error,
    db::lock_connection,
    exchange_rate::{CurrencyCode, LocalCurrency, RateFeed, feed::SheetRate, upsert_exchange_rate},
    timezone::local_today,
};

/// A rate saved by [ingest_today].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedRate {
    pub code: CurrencyCode,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub rate: Decimal,
}

/// The result of importing the latest rate sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodayIngestion {
    /// The day the rates were stored under.
    pub date: Date,
    pub message: String,
    pub saved_rates: Vec<SavedRate>,
}

/// The result of importing the rate sheets for a range of days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillReport {
    /// The first day of the range.
    pub start: Date,
    /// The last day of the range, inclusive.
    pub end: Date,
    /// The number of days whose sheet was stored.
    pub days_imported: u32,
    /// The number of days whose sheet could not be fetched or parsed.
    pub days_skipped: u32,
    /// The total number of rates stored.
    pub rates_saved: u32,
}

/// Store `rates` under `date` in one database transaction, skipping the local currency.
fn store_rates(
    rates: &[SheetRate],
    date: Date,
    local_currency: &LocalCurrency,
    db_connection: &Mutex<Connection>,
) -> Result<Vec<SavedRate>, Error> {
    let mut connection = lock_connection(db_connection)?;
    let transaction = connection.transaction()?;

    let mut saved = Vec::with_capacity(rates.len());
    for SheetRate { code, rate } in rates {
        if local_currency.matches(code) {
            continue;
        }

        upsert_exchange_rate(code, *rate, date, &transaction)?;
        saved.push(SavedRate {
            code: code.clone(),
            rate: *rate,
        });
    }

    transaction.commit()?;

    Ok(saved)
}

/// Fetch the latest rate sheet and store its rates.
///
/// The rates are stored under the date printed on the sheet, or today's date
/// in `local_timezone` if the sheet has none.
///
/// # Errors
/// Returns [Error::RateFeed] if the sheet could not be fetched or parsed.
pub async fn ingest_today(
    feed: &RateFeed,
    db_connection: &Mutex<Connection>,
    local_currency: &LocalCurrency,
    local_timezone: &str,
) -> Result<TodayIngestion, Error> {
    let sheet = feed.fetch_today().await?;
    let date = sheet.date.unwrap_or_else(|| local_today(local_timezone));

    let saved_rates = store_rates(&sheet.rates, date, local_currency, db_connection)?;
    tracing::info!("Stored {} exchange rates for {date}", saved_rates.len());

    Ok(TodayIngestion {
        date,
        message: format!("Saved {} exchange rates.", saved_rates.len()),
        saved_rates,
    })
}

/// Fetch and store the rate sheet of every day from `start` to `end` inclusive.
///
/// A day whose sheet cannot be fetched or parsed, e.g. a weekend, is logged
/// and skipped. The rates are stored under the requested day.
///
/// # Errors
/// Returns [Error::InvalidDateRange] if `start` is after `end`, or an error
/// if the rates could not be written to the database.
pub async fn backfill_rates(
    feed: &RateFeed,
    db_connection: &Mutex<Connection>,
    local_currency: &LocalCurrency,
    start: Date,
    end: Date,
) -> Result<BackfillReport, Error> {
    if start > end {
        return Err(Error::InvalidDateRange { start, end });
    }

    let mut report = BackfillReport {
        start,
        end,
        days_imported: 0,
        days_skipped: 0,
        rates_saved: 0,
    };

    let mut day = start;
    loop {
        match feed.fetch_day(day).await {
            Ok(sheet) => {
                let saved = store_rates(&sheet.rates, day, local_currency, db_connection)?;
                tracing::info!("{day}: stored {} exchange rates", saved.len());
                report.days_imported += 1;
                report.rates_saved += saved.len() as u32;
            }
            Err(error) => {
                tracing::warn!("{day}: skipped, {error}");
                report.days_skipped += 1;
            }
        }

        if day >= end {
            break;
        }
        day = day.saturating_add(Duration::DAY);
    }

    Ok(report)
}
