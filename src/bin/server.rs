use std::{env, fs::OpenOptions, net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    http::HeaderValue,
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use finans_rs::{
    AppState, CurrencyCode, DEFAULT_FEED_URL, RateFeedConfig, RateSide, build_router,
    get_local_offset, graceful_shutdown, logging_middleware,
};

/// The REST API server for finans_rs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

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

    /// An origin the frontend is served from, may be repeated.
    #[arg(long = "allowed-origin")]
    allowed_origins: Vec<String>,

    /// How long access tokens are valid for, in minutes.
    #[arg(long, default_value_t = 60)]
    token_minutes: i64,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));

    let secret = env::var("SECRET").expect("The environment variable 'SECRET' must be set");

    if get_local_offset(&args.local_timezone).is_none() {
        tracing::warn!(
            "Unknown timezone {:?}, dates will be in UTC",
            args.local_timezone
        );
    }

    let mut rate_feed_config = RateFeedConfig {
        base_url: args.feed_url,
        side: args.rate_side,
        ..Default::default()
    };
    if !args.currencies.is_empty() {
        rate_feed_config.currencies = args.currencies;
    }

    let conn = Connection::open(&args.db_path).unwrap_or_else(|error| {
        panic!("Could not open the database at {}: {error}", args.db_path)
    });
    let mut state = AppState::new(conn, &secret, rate_feed_config, &args.local_timezone)
        .expect("Could not create the app state");
    state.token_duration = Duration::minutes(args.token_minutes);

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(state)
        .layer(middleware::from_fn(logging_middleware))
        .layer(cors_layer(&args.allowed_origins));
    let router = add_tracing_layer(router);

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("The server stopped unexpectedly");
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();
}

/// Allow any method and header from the frontend origins.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = if allowed_origins.is_empty() {
        vec![
            "http://localhost:3000".to_owned(),
            "http://127.0.0.1:3000".to_owned(),
        ]
    } else {
        allowed_origins.to_vec()
    };

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(origin) => Some(origin),
            Err(error) => {
                tracing::warn!("Ignoring invalid origin {origin:?}: {error}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
