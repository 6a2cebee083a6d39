use std::{error::Error, path::Path, process::exit, sync::Mutex};

use clap::Parser;
use rusqlite::Connection;
use time::{Date, macros::format_description};
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use finans_rs::{
    CurrencyCode, DEFAULT_FEED_URL, LocalCurrency, RateFeed, RateFeedConfig, RateSide,
    backfill_rates, initialize_db, local_today,
};

/// A utility for importing the central bank's exchange rates for a range of days.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The first day to import, e.g. 2024-01-01.
    #[arg(long, value_parser = parse_date)]
    start: Date,

    /// The last day to import, defaults to today.
    #[arg(long, value_parser = parse_date)]
    end: Option<Date>,

    /// The base URL of the central bank's exchange rate sheets.
    #[arg(long, default_value = DEFAULT_FEED_URL)]
    feed_url: String,

    /// Which of the published forex rates to store.
    #[arg(long, value_enum, default_value_t = RateSide::Buying)]
    rate_side: RateSide,

    /// Comma separated currency codes to import, e.g. "USD,EUR".
    #[arg(long, value_delimiter = ',')]
    currencies: Vec<CurrencyCode>,

    /// The canonical timezone name used to decide what today's date is.
    #[arg(long, default_value = "Europe/Istanbul")]
    local_timezone: String,
}

fn parse_date(text: &str) -> Result<Date, time::error::Parse> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
}

/// Import the rates of every day in the range and print a summary.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_filter(filter::LevelFilter::INFO),
        )
        .init();

    let args = Args::parse();
    let db_path = Path::new(&args.db_path);

    if db_path.extension().is_none_or(|extension| extension.is_empty()) {
        eprintln!("Database path must include a file extension (e.g., 'finans.db').");
        exit(1);
    }

    let end = args.end.unwrap_or_else(|| local_today(&args.local_timezone));

    let mut config = RateFeedConfig {
        base_url: args.feed_url,
        side: args.rate_side,
        ..Default::default()
    };
    if !args.currencies.is_empty() {
        config.currencies = args.currencies;
    }
    let feed = RateFeed::new(config)?;

    let connection = Connection::open(db_path)?;
    initialize_db(&connection)?;
    let connection = Mutex::new(connection);

    println!("Importing exchange rates from {} to {end}", args.start);
    let report = backfill_rates(
        &feed,
        &connection,
        &LocalCurrency::default(),
        args.start,
        end,
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
