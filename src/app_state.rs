//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use time::Duration;

use crate::{
    Error, PasswordHash,
    auth::{DEFAULT_TOKEN_DURATION, JwtKeys},
    db::initialize,
    exchange_rate::{LocalCurrency, RateFeed, RateFeedConfig},
    pagination::PaginationConfig,
};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,

    /// The keys for signing and verifying bearer tokens.
    pub jwt_keys: Arc<JwtKeys>,

    /// The duration for which access tokens are valid.
    pub token_duration: Duration,

    /// The bcrypt cost used when hashing the passwords of new users.
    pub password_hash_cost: u32,

    /// The config that controls the size of pages of records.
    pub pagination_config: PaginationConfig,

    /// The client for the central bank's exchange rate sheets.
    pub rate_feed: RateFeed,

    /// The currency that totals are converted into.
    pub local_currency: LocalCurrency,

    /// The local timezone as a canonical timezone name, e.g. "Europe/Istanbul".
    pub local_timezone: String,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Europe/Istanbul".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized or the HTTP
    /// client for the rate feed cannot be built.
    pub fn new(
        db_connection: Connection,
        jwt_secret: &str,
        rate_feed_config: RateFeedConfig,
        local_timezone: &str,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            jwt_keys: Arc::new(JwtKeys::new(jwt_secret)),
            token_duration: DEFAULT_TOKEN_DURATION,
            password_hash_cost: PasswordHash::DEFAULT_COST,
            pagination_config: PaginationConfig::default(),
            rate_feed: RateFeed::new(rate_feed_config)?,
            local_currency: LocalCurrency::default(),
            local_timezone: local_timezone.to_owned(),
        })
    }
}
