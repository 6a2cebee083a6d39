//! Daily exchange rates: importing them from the central bank's feed,
//! storing them, and converting amounts into the local currency.

mod conversion;
mod core;
mod currency;
mod endpoints;
mod feed;
mod ingest;

pub use conversion::{Conversion, convert_to_local};
pub use core::{
    ExchangeRate, create_exchange_rate_table, find_rate_as_of, list_exchange_rates,
    upsert_exchange_rate,
};
pub use currency::{CurrencyCode, LocalCurrency};
pub use endpoints::{
    backfill_endpoint, convert_endpoint, fetch_exchange_rates_endpoint,
    list_stored_rates_endpoint,
};
pub use feed::{
    DEFAULT_FEED_URL, FeedError, RateFeed, RateFeedConfig, RateSheet, RateSide, SheetRate,
    parse_rate_sheet,
};
pub use ingest::{BackfillReport, SavedRate, TodayIngestion, backfill_rates, ingest_today};
