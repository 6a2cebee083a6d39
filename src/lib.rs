//! Finans is a bookkeeping backend for projects, categories and transactions.
//!
//! Foreign currency amounts are converted into the local currency with the
//! daily exchange rates published by the central bank. This library provides
//! the JSON REST API, the exchange rate ingestion and the conversion lookup.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use time::Date;
use tokio::signal;

mod app_state;
mod auth;
mod category;
mod db;
mod endpoints;
mod exchange_rate;
mod extract;
mod logging;
mod money;
mod name;
mod pagination;
mod password;
mod project;
mod register_user;
mod routing;
mod timezone;
mod transaction;
mod user;

pub use app_state::AppState;
pub use category::{CategoryId, EntryType};
pub use db::initialize as initialize_db;
pub use exchange_rate::{
    BackfillReport, CurrencyCode, DEFAULT_FEED_URL, FeedError, LocalCurrency, RateFeed,
    RateFeedConfig, RateSide, backfill_rates,
};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use pagination::PaginationConfig;
pub use password::{PasswordHash, ValidatedPassword};
pub use project::ProjectId;
pub use routing::build_router;
pub use timezone::{get_local_offset, local_today};
pub use transaction::TransactionId;
pub use user::{Role, User, UserID};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request body, query string or path could not be parsed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The email and password did not match a registered user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The request did not include a bearer token.
    #[error("missing bearer token")]
    MissingToken,

    /// The bearer token could not be decoded, has expired, or belongs to a
    /// user that no longer exists.
    #[error("invalid or expired token")]
    InvalidToken,

    /// The authenticated user does not have the role required by the route.
    #[error("the role \"{0}\" is required to access this resource")]
    Forbidden(Role),

    /// The access token could not be signed.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("could not create access token: {0}")]
    TokenCreation(String),

    /// An empty string was used as a password.
    #[error("password cannot be empty")]
    EmptyPassword,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The string is not a valid email address.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The email is already used by another user.
    #[error("the email \"{0}\" is already registered")]
    DuplicateEmail(String),

    /// An empty string was used to create a project or category name.
    #[error("name cannot be empty")]
    EmptyName,

    /// Another project already uses the name, ignoring letter case.
    #[error("a project named \"{0}\" already exists")]
    DuplicateProjectName(String),

    /// Another category of the same type already uses the name, ignoring letter case.
    #[error("a {kind} category named \"{name}\" already exists")]
    DuplicateCategory {
        /// The type of the rejected category.
        kind: EntryType,
        /// The rejected name.
        name: String,
    },

    /// The type of a category or transaction is not one of the allowed values.
    #[error("\"{0}\" is not a valid type, expected \"gelir\" or \"gider\"")]
    InvalidEntryType(String),

    /// The string is not a currency code made of two to five letters.
    #[error("\"{0}\" is not a valid currency code")]
    InvalidCurrency(String),

    /// The project ID used for a transaction did not match a project.
    #[error("the project ID {0} does not refer to a valid project")]
    InvalidProject(ProjectId),

    /// The category ID used for a transaction did not match a category.
    #[error("the category ID {0} does not refer to a valid category")]
    InvalidCategory(CategoryId),

    /// Tried to delete a project that transactions still refer to.
    #[error("the project is used by one or more transactions and cannot be deleted")]
    ProjectInUse,

    /// Tried to delete a category that transactions still refer to.
    #[error("the category is used by one or more transactions and cannot be deleted")]
    CategoryInUse,

    /// The start of a date range is after its end.
    #[error("the start date {start} is after the end date {end}")]
    InvalidDateRange {
        /// The first day of the range.
        start: Date,
        /// The last day of the range.
        end: Date,
    },

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to update a project that does not exist
    #[error("tried to update a project that is not in the database")]
    UpdateMissingProject,

    /// Tried to delete a project that does not exist
    #[error("tried to delete a project that is not in the database")]
    DeleteMissingProject,

    /// Tried to update a category that does not exist
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// The exchange rate feed could not be fetched or parsed.
    #[error("could not fetch exchange rates: {0}")]
    RateFeed(#[from] FeedError),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

/// The JSON body sent to the client when a request fails.
#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

impl Error {
    /// The HTTP status code used when the error is sent to a client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidCredentials | Error::MissingToken | Error::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::InvalidRequest(_)
            | Error::EmptyPassword
            | Error::InvalidEmail(_)
            | Error::DuplicateEmail(_)
            | Error::EmptyName
            | Error::DuplicateProjectName(_)
            | Error::DuplicateCategory { .. }
            | Error::InvalidEntryType(_)
            | Error::InvalidCurrency(_)
            | Error::InvalidProject(_)
            | Error::InvalidCategory(_)
            | Error::ProjectInUse
            | Error::CategoryInUse
            | Error::InvalidDateRange { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound
            | Error::UpdateMissingProject
            | Error::DeleteMissingProject
            | Error::UpdateMissingCategory
            | Error::DeleteMissingCategory
            | Error::UpdateMissingTransaction
            | Error::DeleteMissingTransaction => StatusCode::NOT_FOUND,
            Error::RateFeed(_) => StatusCode::BAD_GATEWAY,
            Error::TokenCreation(_)
            | Error::HashingError(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let detail = match status {
            // Internal errors are not intended to be shown to the client.
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("An unexpected error occurred: {}", self);
                "An unexpected error occurred, check the server logs for more details.".to_owned()
            }
            StatusCode::BAD_GATEWAY => {
                tracing::warn!("{self}");
                self.to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}
