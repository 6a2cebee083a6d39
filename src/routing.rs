//! Application router configuration with protected and unprotected route definitions.

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{FromRef, State},
    middleware,
    routing::{get, post},
};
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    auth::{admin_only_endpoint, auth_guard, get_me_endpoint, log_in_endpoint, role_guard},
    category::{
        create_category_endpoint, delete_category_endpoint, get_category_endpoint,
        list_categories_endpoint, update_category_endpoint,
    },
    db::lock_connection,
    endpoints,
    exchange_rate::{
        backfill_endpoint, convert_endpoint, fetch_exchange_rates_endpoint,
        list_stored_rates_endpoint,
    },
    project::{
        create_project_endpoint, delete_project_endpoint, get_project_endpoint,
        list_projects_endpoint, update_project_endpoint,
    },
    register_user::register_user,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_transaction_endpoint,
        list_transactions_endpoint, update_transaction_endpoint,
    },
    user::Role,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::PING_DB, get(ping_db))
        .route(endpoints::REGISTER, post(register_user))
        .route(endpoints::LOG_IN, post(log_in_endpoint))
        .route(endpoints::EXCHANGE_RATES, get(fetch_exchange_rates_endpoint))
        .route(
            endpoints::STORED_EXCHANGE_RATES,
            get(list_stored_rates_endpoint),
        )
        .route(endpoints::CONVERT_CURRENCY, get(convert_endpoint))
        .route(
            endpoints::PROJECTS,
            get(list_projects_endpoint).post(create_project_endpoint),
        )
        .route(
            endpoints::PROJECT,
            get(get_project_endpoint)
                .put(update_project_endpoint)
                .delete(delete_project_endpoint),
        )
        .route(
            endpoints::CATEGORIES,
            get(list_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::CATEGORY,
            get(get_category_endpoint)
                .put(update_category_endpoint)
                .delete(delete_category_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .put(update_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        );

    let authenticated_routes = Router::new().route(endpoints::ME, get(get_me_endpoint));

    // Layers run outermost first, so the role check is added before the token check.
    let admin_routes = Router::new()
        .route(endpoints::ADMIN_ONLY, get(admin_only_endpoint))
        .route(endpoints::BACKFILL_EXCHANGE_RATES, post(backfill_endpoint))
        .route_layer(middleware::from_fn_with_state(Role::admin(), role_guard));

    let protected_routes = authenticated_routes
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .with_state(state)
}

/// The database connection used by the health check.
#[derive(Debug, Clone)]
struct PingState {
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for PingState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Check that the database answers a trivial query.
async fn ping_db(State(state): State<PingState>) -> Result<Json<Value>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let _: i64 = connection.query_row("SELECT 1", [], |row| row.get(0))?;

    Ok(Json(json!({ "status": "ok" })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppState, endpoints, exchange_rate::RateFeedConfig};

    use super::build_router;

    fn get_test_server() -> TestServer {
        let mut state = AppState::new(
            Connection::open_in_memory().unwrap(),
            "foobar",
            RateFeedConfig {
                base_url: "http://127.0.0.1:9".to_owned(),
                ..Default::default()
            },
            "Europe/Istanbul",
        )
        .unwrap();
        state.password_hash_cost = 4;

        TestServer::new(build_router(state)).expect("Could not create test server.")
    }

    async fn register_and_log_in(server: &TestServer, email: &str, role: &str) -> String {
        server
            .post(endpoints::REGISTER)
            .json(&json!({
                "email": email,
                "password": "gizli",
                "first_name": "Zeynep",
                "last_name": "Kaya",
                "role": role,
            }))
            .await
            .assert_status_ok();

        server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": email, "password": "gizli" }))
            .await
            .json::<Value>()["access_token"]
            .as_str()
            .unwrap()
            .to_owned()
    }

    #[tokio::test]
    async fn ping_db_reports_ok() {
        let server = get_test_server();

        let response = server.get(endpoints::PING_DB).await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>(), json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn me_requires_token() {
        let server = get_test_server();

        server
            .get(endpoints::ME)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_returns_user_for_token() {
        let server = get_test_server();
        let token = register_and_log_in(&server, "zeynep@example.com", "").await;

        let response = server.get(endpoints::ME).authorization_bearer(token).await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["email"], "zeynep@example.com");
    }

    #[tokio::test]
    async fn admin_routes_check_role() {
        let server = get_test_server();
        let staff_token = register_and_log_in(&server, "staff@example.com", "").await;
        let admin_token = register_and_log_in(&server, "admin@example.com", "admin").await;

        server
            .get(endpoints::ADMIN_ONLY)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .get(endpoints::ADMIN_ONLY)
            .authorization_bearer(staff_token.clone())
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .post(endpoints::BACKFILL_EXCHANGE_RATES)
            .authorization_bearer(staff_token)
            .json(&json!({ "start": "2024-01-15", "end": "2024-01-15" }))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let response = server
            .get(endpoints::ADMIN_ONLY)
            .authorization_bearer(admin_token)
            .await;
        response.assert_status_ok();
        assert_eq!(
            response.json::<Value>(),
            json!({ "message": "Welcome to admin panel" })
        );
    }
}
