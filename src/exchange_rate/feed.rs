//! The client for the central bank's daily XML rate sheets.

use std::{str::FromStr, time::Duration};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, macros::format_description};

use crate::exchange_rate::CurrencyCode;

/// The default location of the rate sheets.
pub const DEFAULT_FEED_URL: &str = "https://www.tcmb.gov.tr/kurlar";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Which of the published forex rates to store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RateSide {
    /// The rate the bank buys foreign currency at (`ForexBuying`).
    #[default]
    Buying,
    /// The rate the bank sells foreign currency at (`ForexSelling`).
    Selling,
}

/// Where to fetch rate sheets from and which rates to keep.
#[derive(Debug, Clone, PartialEq)]
pub struct RateFeedConfig {
    /// The base URL, without a trailing slash.
    pub base_url: String,
    /// Whether to store the buying or the selling rate.
    pub side: RateSide,
    /// The currencies to store, every other entry in a sheet is ignored.
    pub currencies: Vec<CurrencyCode>,
}

impl Default for RateFeedConfig {
    fn default() -> Self {
        let currencies = ["USD", "EUR", "CHF", "GBP", "CAD"]
            .into_iter()
            .filter_map(|code| CurrencyCode::new(code).ok())
            .collect();

        Self {
            base_url: DEFAULT_FEED_URL.to_owned(),
            side: RateSide::default(),
            currencies,
        }
    }
}

/// The ways fetching a rate sheet can fail.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeedError {
    /// The HTTP client could not be created.
    #[error("could not create the HTTP client: {0}")]
    Client(String),

    /// The request could not be sent or the body could not be read.
    #[error("request to {url} failed: {reason}")]
    Request {
        /// The requested URL.
        url: String,
        /// What went wrong.
        reason: String,
    },

    /// The feed answered with a status other than 200.
    #[error("{url} responded with status {status}")]
    Status {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The body is not a rate sheet.
    #[error("could not parse the rate sheet: {0}")]
    Parse(String),
}

/// A single currency's rate to the local currency, per one unit of the currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRate {
    /// The currency code.
    pub code: CurrencyCode,
    /// The rate for one unit.
    pub rate: Decimal,
}

/// The rates for the configured currencies in one day's sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateSheet {
    /// The date printed on the sheet, if it could be read.
    pub date: Option<Date>,
    /// The usable rates. Currencies with a missing or malformed rate are left out.
    pub rates: Vec<SheetRate>,
}

#[derive(Debug, Deserialize)]
struct SheetXml {
    #[serde(rename = "@Tarih", default)]
    tarih: Option<String>,
    #[serde(rename = "Currency", default)]
    currencies: Vec<CurrencyXml>,
}

#[derive(Debug, Deserialize)]
struct CurrencyXml {
    #[serde(rename = "@CurrencyCode", default)]
    code: Option<String>,
    #[serde(rename = "Unit", default)]
    unit: Option<String>,
    #[serde(rename = "ForexBuying", default)]
    forex_buying: Option<String>,
    #[serde(rename = "ForexSelling", default)]
    forex_selling: Option<String>,
}

/// Parse a rate sheet, keeping the `side` rate of the `wanted` currencies.
///
/// Decimal commas are accepted. Rates quoted for more than one unit, e.g.
/// 100 JPY, are divided by the unit.
///
/// # Errors
/// Returns [FeedError::Parse] if `xml` is not a rate sheet. A single
/// currency with a missing or malformed rate is skipped instead.
pub fn parse_rate_sheet(
    xml: &str,
    side: RateSide,
    wanted: &[CurrencyCode],
) -> Result<RateSheet, FeedError> {
    let sheet: SheetXml =
        quick_xml::de::from_str(xml).map_err(|error| FeedError::Parse(error.to_string()))?;

    let date = sheet.tarih.as_deref().and_then(parse_sheet_date);

    let rates = sheet
        .currencies
        .into_iter()
        .filter_map(|currency| {
            let code = CurrencyCode::new(currency.code.as_deref()?).ok()?;

            if !wanted.contains(&code) {
                return None;
            }

            let raw_rate = match side {
                RateSide::Buying => currency.forex_buying.as_deref(),
                RateSide::Selling => currency.forex_selling.as_deref(),
            };

            match parse_rate(raw_rate, currency.unit.as_deref()) {
                Some(rate) => Some(SheetRate { code, rate }),
                None => {
                    tracing::warn!("Skipping {code}: no usable {side:?} rate ({raw_rate:?})");
                    None
                }
            }
        })
        .collect();

    Ok(RateSheet { date, rates })
}

fn parse_sheet_date(tarih: &str) -> Option<Date> {
    Date::parse(tarih.trim(), format_description!("[day].[month].[year]"))
        .inspect_err(|error| tracing::warn!("Could not parse sheet date {tarih:?}: {error}"))
        .ok()
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();

    if text.is_empty() {
        return None;
    }

    Decimal::from_str(&text.replace(',', ".")).ok()
}

fn parse_rate(raw_rate: Option<&str>, raw_unit: Option<&str>) -> Option<Decimal> {
    let rate = parse_decimal(raw_rate?)?;

    if rate <= Decimal::ZERO {
        return None;
    }

    match raw_unit.and_then(parse_decimal) {
        Some(unit) if unit > Decimal::ONE => rate.checked_div(unit).map(|rate| rate.normalize()),
        _ => Some(rate),
    }
}

/// Fetches daily rate sheets over HTTP.
#[derive(Debug, Clone)]
pub struct RateFeed {
    client: reqwest::Client,
    config: RateFeedConfig,
}

impl RateFeed {
    /// Create a feed client.
    ///
    /// # Errors
    /// Returns [FeedError::Client] if the HTTP client could not be created.
    pub fn new(config: RateFeedConfig) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .user_agent("finans_rs/0.1")
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| FeedError::Client(error.to_string()))?;

        Ok(Self { client, config })
    }

    /// The feed's configuration.
    pub fn config(&self) -> &RateFeedConfig {
        &self.config
    }

    /// The URL of the latest sheet.
    pub fn today_url(&self) -> String {
        format!("{}/today.xml", self.config.base_url.trim_end_matches('/'))
    }

    /// The URL of the sheet for `date`, e.g. `{base}/202401/15012024.xml`.
    pub fn day_url(&self, date: Date) -> String {
        format!(
            "{}/{:04}{:02}/{:02}{:02}{:04}.xml",
            self.config.base_url.trim_end_matches('/'),
            date.year(),
            u8::from(date.month()),
            date.day(),
            u8::from(date.month()),
            date.year(),
        )
    }

    /// Fetch and parse the latest sheet.
    pub async fn fetch_today(&self) -> Result<RateSheet, FeedError> {
        self.fetch(&self.today_url()).await
    }

    /// Fetch and parse the sheet published for `date`.
    ///
    /// The bank does not publish on weekends and holidays, those days respond
    /// with [FeedError::Status].
    pub async fn fetch_day(&self, date: Date) -> Result<RateSheet, FeedError> {
        self.fetch(&self.day_url(date)).await
    }

    async fn fetch(&self, url: &str) -> Result<RateSheet, FeedError> {
        tracing::debug!("Fetching rate sheet {url}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| FeedError::Request {
                url: url.to_owned(),
                reason: error.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|error| FeedError::Request {
            url: url.to_owned(),
            reason: error.to_string(),
        })?;

        parse_rate_sheet(&body, self.config.side, &self.config.currencies)
    }
}
