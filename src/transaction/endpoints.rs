//! Route handlers for listing, creating, updating and deleting transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    db::lock_connection,
    exchange_rate::LocalCurrency,
    extract::{ApiJson, ApiPath, ApiQuery},
    pagination::{ListParams, ListQuery, Page, PaginationConfig},
    transaction::{
        db::{
            create_transaction, delete_transaction, get_transaction, list_transactions,
            update_transaction,
        },
        domain::{NewTransaction, Transaction, TransactionData, TransactionId},
    },
};

/// The state needed to manage transactions.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The default and maximum page sizes.
    pub pagination_config: PaginationConfig,
    /// The currency that local totals are expressed in.
    pub local_currency: LocalCurrency,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
            local_currency: state.local_currency.clone(),
        }
    }
}

/// A route handler for searching, sorting and paging transactions.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Page<Transaction>>, Error> {
    let query = ListQuery::from_params(params, &state.pagination_config);
    let connection = lock_connection(&state.db_connection)?;

    list_transactions(&query, &connection).map(Json)
}

/// A route handler for getting a single transaction.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    ApiPath(transaction_id): ApiPath<TransactionId>,
) -> Result<Json<Transaction>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_transaction(transaction_id, &connection).map(Json)
}

/// A route handler for creating a new transaction, responds with the created
/// transaction including its local total.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    ApiJson(data): ApiJson<TransactionData>,
) -> Result<Json<Transaction>, Error> {
    let new_transaction = NewTransaction::try_from(data)?;
    let connection = lock_connection(&state.db_connection)?;

    let transaction = create_transaction(new_transaction, &state.local_currency, &connection)?;
    tracing::info!(
        "Created transaction {}: {} {}",
        transaction.id,
        transaction.amount,
        transaction.currency
    );

    Ok(Json(transaction))
}

/// A route handler for replacing a transaction, responds with the updated transaction.
pub async fn update_transaction_endpoint(
    State(state): State<TransactionState>,
    ApiPath(transaction_id): ApiPath<TransactionId>,
    ApiJson(data): ApiJson<TransactionData>,
) -> Result<Json<Transaction>, Error> {
    let new_transaction = NewTransaction::try_from(data)?;
    let connection = lock_connection(&state.db_connection)?;

    update_transaction(
        transaction_id,
        new_transaction,
        &state.local_currency,
        &connection,
    )
    .map(Json)
}

/// A route handler for deleting a transaction.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    ApiPath(transaction_id): ApiPath<TransactionId>,
) -> Result<Json<Value>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_transaction(transaction_id, &connection)?;
    tracing::info!("Deleted transaction {transaction_id}");

    Ok(Json(json!({ "message": "Transaction deleted." })))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Router,
        http::StatusCode,
        routing::{get, put},
    };
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{
        category::{EntryType, create_category},
        db::initialize,
        endpoints,
        exchange_rate::LocalCurrency,
        name::Name,
        pagination::PaginationConfig,
        project::create_project,
    };

    use super::{
        TransactionState, create_transaction_endpoint, delete_transaction_endpoint,
        get_transaction_endpoint, list_transactions_endpoint, update_transaction_endpoint,
    };

    fn get_test_server() -> TestServer {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        create_project(Name::new_unchecked("Bina"), &connection).unwrap();
        create_category(EntryType::Income, Name::new_unchecked("Hakediş"), &connection).unwrap();
        let state = TransactionState {
            db_connection: Arc::new(Mutex::new(connection)),
            pagination_config: PaginationConfig::default(),
            local_currency: LocalCurrency::default(),
        };

        let app = Router::new()
            .route(
                endpoints::TRANSACTIONS,
                get(list_transactions_endpoint).post(create_transaction_endpoint),
            )
            .route(
                endpoints::TRANSACTION,
                put(update_transaction_endpoint)
                    .get(get_transaction_endpoint)
                    .delete(delete_transaction_endpoint),
            )
            .with_state(state);

        TestServer::new(app).expect("Could not create test server.")
    }

    fn transaction_json(currency: &str) -> Value {
        json!({
            "type": "Gelir",
            "project_id": 1,
            "category_id": 1,
            "date": "2024-01-15",
            "amount": 1250.5,
            "currency": currency,
            "description": "Ocak hakedişi",
        })
    }

    #[tokio::test]
    async fn create_then_get_transaction() {
        let server = get_test_server();

        let created = server
            .post(endpoints::TRANSACTIONS)
            .json(&transaction_json("tl"))
            .await;
        created.assert_status_ok();
        let body = created.json::<Value>();
        assert_eq!(body["type"], "gelir");
        assert_eq!(body["currency"], "TL");
        assert_eq!(body["project_name"], "Bina");
        assert_eq!(body["local_total"], json!(1250.5));

        let fetched = server.get("/transactions/1").await.json::<Value>();
        assert_eq!(fetched, body);
    }

    #[tokio::test]
    async fn invalid_fields_are_client_errors() {
        let server = get_test_server();
        let mut bad_type = transaction_json("TRY");
        bad_type["type"] = json!("transfer");
        let mut bad_project = transaction_json("TRY");
        bad_project["project_id"] = json!(9);

        for body in [bad_type, bad_project, transaction_json("U$D")] {
            server
                .post(endpoints::TRANSACTIONS)
                .json(&body)
                .await
                .assert_status(StatusCode::BAD_REQUEST);
        }

        let page = server.get(endpoints::TRANSACTIONS).await.json::<Value>();
        assert_eq!(page["total"], 0);
    }

    #[tokio::test]
    async fn malformed_bodies_are_json_client_errors() {
        let server = get_test_server();
        let mut bad_date = transaction_json("TRY");
        bad_date["date"] = json!("15/01/2024");
        let mut bad_amount = transaction_json("TRY");
        bad_amount["amount"] = json!("çok");

        let cases = [
            json!({ "type": "gider", "project_id": 1 }),
            bad_date,
            bad_amount,
        ];
        for body in cases {
            let response = server.post(endpoints::TRANSACTIONS).json(&body).await;

            response.assert_status(StatusCode::BAD_REQUEST);
            assert!(response.json::<Value>()["detail"].is_string());
        }

        let missing_field = server
            .put("/transactions/1")
            .json(&json!({ "type": "gider", "project_id": 1 }))
            .await;
        let detail = missing_field.json::<Value>()["detail"]
            .as_str()
            .unwrap()
            .to_owned();
        assert!(detail.contains("category_id"), "got {detail:?}");
    }

    #[tokio::test]
    async fn non_numeric_id_is_a_json_client_error() {
        let server = get_test_server();

        let response = server.get("/transactions/abc").await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.json::<Value>()["detail"].is_string());
    }

    #[tokio::test]
    async fn update_missing_transaction_with_invalid_project_is_not_found() {
        let server = get_test_server();
        let mut body = transaction_json("TRY");
        body["project_id"] = json!(9);

        let response = server.put("/transactions/5").json(&body).await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn foreign_transaction_without_rate_has_null_total() {
        let server = get_test_server();

        let body = server
            .post(endpoints::TRANSACTIONS)
            .json(&transaction_json("USD"))
            .await
            .json::<Value>();

        assert_eq!(body["local_total"], Value::Null);
    }

    #[tokio::test]
    async fn delete_missing_transaction_is_not_found() {
        let server = get_test_server();

        let response = server.delete("/transactions/5").await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert!(response.json::<Value>()["detail"].is_string());
    }
}
