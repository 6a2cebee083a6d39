//! The registration endpoint for creating user accounts.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    db::lock_connection,
    extract::ApiJson,
    user::{Email, NewUser, Role, UserResponse, create_user},
};

/// The state needed for registering a user.
#[derive(Debug, Clone)]
pub struct RegisterState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The bcrypt cost used to hash new passwords.
    pub password_hash_cost: u32,
}

impl FromRef<AppState> for RegisterState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            password_hash_cost: state.password_hash_cost,
        }
    }
}

/// The data for registering a new user.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterData {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    /// Defaults to [Role::DEFAULT] when missing or empty.
    #[serde(default)]
    pub role: Option<String>,
}

/// A route handler for registering a user, responds with the new user without
/// the password hash.
///
/// # Errors
///
/// Responds with 400 if the email is invalid or already registered, or if the
/// password is empty.
pub async fn register_user(
    State(state): State<RegisterState>,
    ApiJson(user_data): ApiJson<RegisterData>,
) -> Result<Json<UserResponse>, Error> {
    let email = Email::new(&user_data.email)?;
    let password = ValidatedPassword::new(&user_data.password)?;
    let password_hash = PasswordHash::new(password, state.password_hash_cost)?;

    let new_user = NewUser {
        email,
        password_hash,
        first_name: user_data.first_name.trim().to_owned(),
        last_name: user_data.last_name.trim().to_owned(),
        phone: user_data.phone.unwrap_or_default(),
        department: user_data.department.unwrap_or_default(),
        role: Role::new(user_data.role.as_deref().unwrap_or_default()),
    };

    let connection = lock_connection(&state.db_connection)?;
    let user = create_user(new_user, &connection)?;
    tracing::info!("Registered user {} with role {}", user.id, user.role);

    Ok(Json(user.into()))
}
