//! Route handlers for importing, listing and applying exchange rates.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    db::lock_connection,
    exchange_rate::{
        BackfillReport, CurrencyCode, ExchangeRate, LocalCurrency, RateFeed, TodayIngestion,
        backfill_rates, convert_to_local, ingest_today, list_exchange_rates,
    },
    extract::{ApiJson, ApiQuery},
    pagination::{Page, PaginationConfig},
};

/// The state needed to import and use exchange rates.
#[derive(Debug, Clone)]
pub struct ExchangeRateState {
    /// The database connection for storing rates.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The client for the central bank's rate sheets.
    pub rate_feed: RateFeed,
    /// The currency rates are quoted in.
    pub local_currency: LocalCurrency,
    /// The canonical timezone name used to decide what "today" is.
    pub local_timezone: String,
    /// The default and maximum page sizes.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for ExchangeRateState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            rate_feed: state.rate_feed.clone(),
            local_currency: state.local_currency.clone(),
            local_timezone: state.local_timezone.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// A route handler that imports the latest rate sheet and responds with the saved rates.
pub async fn fetch_exchange_rates_endpoint(
    State(state): State<ExchangeRateState>,
) -> Result<Json<TodayIngestion>, Error> {
    ingest_today(
        &state.rate_feed,
        &state.db_connection,
        &state.local_currency,
        &state.local_timezone,
    )
    .await
    .map(Json)
}

/// The query parameters for listing stored rates.
#[derive(Debug, Default, Deserialize)]
pub struct StoredRatesParams {
    /// Only list the rates of this currency.
    pub currency: Option<String>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

/// A route handler for listing stored rates, newest first.
pub async fn list_stored_rates_endpoint(
    State(state): State<ExchangeRateState>,
    ApiQuery(params): ApiQuery<StoredRatesParams>,
) -> Result<Json<Page<ExchangeRate>>, Error> {
    let currency = params
        .currency
        .as_deref()
        .filter(|currency| !currency.trim().is_empty())
        .map(CurrencyCode::new)
        .transpose()?;
    let config = &state.pagination_config;
    let limit = params
        .limit
        .unwrap_or(config.default_limit)
        .clamp(1, config.max_limit.max(1));

    let connection = lock_connection(&state.db_connection)?;

    list_exchange_rates(
        currency.as_ref(),
        limit,
        params.skip.unwrap_or(0),
        &connection,
    )
    .map(Json)
}

/// The query parameters for a conversion.
#[derive(Debug, Deserialize)]
pub struct ConvertParams {
    pub currency: String,
    pub amount: Decimal,
    pub date: Date,
}

/// The converted amount, `rate` and `local_total` are null when no rate is known.
#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub currency: CurrencyCode,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub amount: Decimal,
    pub date: Date,
    #[serde(serialize_with = "rust_decimal::serde::float_option::serialize")]
    pub rate: Option<Decimal>,
    #[serde(serialize_with = "rust_decimal::serde::float_option::serialize")]
    pub local_total: Option<Decimal>,
}

/// A route handler for converting an amount with the rate known on a date.
pub async fn convert_endpoint(
    State(state): State<ExchangeRateState>,
    ApiQuery(params): ApiQuery<ConvertParams>,
) -> Result<Json<ConvertResponse>, Error> {
    let currency = CurrencyCode::new(&params.currency)?;
    let connection = lock_connection(&state.db_connection)?;

    let conversion = convert_to_local(
        params.amount,
        &currency,
        params.date,
        &state.local_currency,
        &connection,
    )?;

    Ok(Json(ConvertResponse {
        currency,
        amount: params.amount,
        date: params.date,
        rate: conversion.map(|conversion| conversion.rate),
        local_total: conversion.map(|conversion| conversion.local_total),
    }))
}

/// The request body for importing a range of days.
#[derive(Debug, Serialize, Deserialize)]
pub struct BackfillRequest {
    pub start: Date,
    pub end: Date,
}

/// A route handler that imports the rate sheet of every day in a range.
pub async fn backfill_endpoint(
    State(state): State<ExchangeRateState>,
    ApiJson(request): ApiJson<BackfillRequest>,
) -> Result<Json<BackfillReport>, Error> {
    let report = backfill_rates(
        &state.rate_feed,
        &state.db_connection,
        &state.local_currency,
        request.start,
        request.end,
    )
    .await?;

    tracing::info!(
        "Backfilled {} to {}: {} days imported, {} skipped",
        report.start,
        report.end,
        report.days_imported,
        report.days_skipped
    );

    Ok(Json(report))
}
