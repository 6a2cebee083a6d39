//! This file defines the route for handling log-in requests.
//! The token module handles the lower level signing and verification of tokens.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    auth::token::{JwtKeys, encode_token},
    db::lock_connection,
    extract::ApiJson,
    user::get_user_by_email,
};

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The keys for signing access tokens.
    pub jwt_keys: Arc<JwtKeys>,
    /// The duration for which access tokens are valid.
    pub token_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            jwt_keys: state.jwt_keys.clone(),
            token_duration: state.token_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The credentials sent by a client to log in.
///
/// The password is stored as a plain string. There is no need for validation here since
/// it will be compared against the hash in the database.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// Email entered during log-in.
    pub email: String,
    /// Password entered during log-in.
    pub password: String,
}

/// The response to a successful log-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    /// The signed token to send in the `Authorization: Bearer` header.
    pub access_token: String,
    /// Always "bearer".
    pub token_type: String,
}

/// Handler for log-in requests.
///
/// # Errors
///
/// This function will return an error in a few situations.
/// - The email does not belong to a registered user.
/// - The password is not correct.
/// - An internal error occurred when verifying the password or signing the token.
///
/// The first two give the same [Error::InvalidCredentials] so that clients
/// cannot tell which emails are registered.
pub async fn log_in_endpoint(
    State(state): State<LoginState>,
    ApiJson(user_data): ApiJson<LogInData>,
) -> Result<Json<AccessToken>, Error> {
    let user = {
        let connection = lock_connection(&state.db_connection)?;

        get_user_by_email(&user_data.email, &connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidCredentials,
            error => error,
        })?
    };

    let is_password_valid = user
        .password_hash
        .verify(&user_data.password)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    if !is_password_valid {
        tracing::info!("Failed log-in attempt for user {}", user.id);
        return Err(Error::InvalidCredentials);
    }

    let access_token = encode_token(user.email.as_ref(), state.token_duration, &state.jwt_keys)?;
    tracing::info!("User {} logged in", user.id);

    Ok(Json(AccessToken {
        access_token,
        token_type: "bearer".to_owned(),
    }))
}

#[cfg(test)]
mod log_in_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;
    use time::Duration;

    use crate::{
        PasswordHash,
        auth::token::{JwtKeys, decode_token},
        db::initialize,
        endpoints,
        user::{Email, NewUser, Role, create_user},
    };

    use super::{AccessToken, LoginState, log_in_endpoint};

    fn get_test_server() -> (TestServer, Arc<JwtKeys>) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        create_user(
            NewUser {
                email: Email::new("ayse@example.com").unwrap(),
                password_hash: PasswordHash::from_raw_password("gizli", 4).unwrap(),
                first_name: "Ayşe".to_owned(),
                last_name: "Yılmaz".to_owned(),
                phone: String::new(),
                department: String::new(),
                role: Role::default(),
            },
            &connection,
        )
        .unwrap();
        let jwt_keys = Arc::new(JwtKeys::new("foobar"));
        let state = LoginState {
            jwt_keys: jwt_keys.clone(),
            token_duration: Duration::minutes(5),
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let app = Router::new()
            .route(endpoints::LOG_IN, post(log_in_endpoint))
            .with_state(state);

        (
            TestServer::new(app).expect("Could not create test server."),
            jwt_keys,
        )
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let (server, keys) = get_test_server();

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "AYSE@example.com", "password": "gizli" }))
            .await;

        response.assert_status_ok();
        let token = response.json::<AccessToken>();
        assert_eq!(token.token_type, "bearer");
        let claims = decode_token(&token.access_token, &keys).unwrap();
        assert_eq!(claims.sub, "ayse@example.com");
    }

    #[tokio::test]
    async fn log_in_fails_with_wrong_password() {
        let (server, _) = get_test_server();

        server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "ayse@example.com", "password": "wrong" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_email() {
        let (server, _) = get_test_server();

        let unknown = server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "nobody@example.com", "password": "gizli" }))
            .await;
        let wrong_password = server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "ayse@example.com", "password": "wrong" }))
            .await;

        unknown.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.text(), wrong_password.text());
    }

    #[tokio::test]
    async fn log_in_fails_with_missing_credentials() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "ayse@example.com" }))
            .await;

        assert!(response.status_code().is_client_error());
    }
}
