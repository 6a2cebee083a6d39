//! Route handlers for routes that only need an authenticated user.

use axum::{Extension, Json};
use serde_json::{Value, json};

use crate::user::{User, UserResponse};

/// A route handler that responds with the authenticated user.
///
/// Must be behind [crate::auth::auth_guard].
pub async fn get_me_endpoint(Extension(user): Extension<User>) -> Json<UserResponse> {
    Json(user.into())
}

/// A route handler for the administrator panel.
///
/// Must be behind [crate::auth::auth_guard] and a [crate::auth::role_guard] for the admin role.
pub async fn admin_only_endpoint(Extension(user): Extension<User>) -> Json<Value> {
    tracing::debug!("Admin {} opened the admin panel", user.id);

    Json(json!({ "message": "Welcome to admin panel" }))
}
