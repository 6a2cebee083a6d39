//! Middleware that authenticates bearer tokens and checks user roles.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::token::{JwtKeys, decode_token},
    db::lock_connection,
    user::{Role, User, get_user_by_email},
};

/// The state needed for the auth middleware
#[derive(Debug, Clone)]
pub struct AuthState {
    /// The database connection for looking up the token's user.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The keys for verifying bearer tokens.
    pub jwt_keys: Arc<JwtKeys>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            jwt_keys: state.jwt_keys.clone(),
        }
    }
}

/// Middleware function that checks for a valid bearer token.
///
/// The token's [User] is placed into the request extensions and the request
/// executed normally if the token is valid, otherwise a 401 response is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user): Extension<User>` to receive the user.
pub async fn auth_guard(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Error> {
    let Authorization(bearer) = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(Error::MissingToken)?;

    let claims = decode_token(bearer.token(), &state.jwt_keys)?;

    let user = {
        let connection = lock_connection(&state.db_connection)?;

        get_user_by_email(&claims.sub, &connection).map_err(|error| match error {
            Error::NotFound => {
                tracing::warn!("Bearer token for unknown user {}", claims.sub);
                Error::InvalidToken
            }
            error => error,
        })?
    };

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Middleware function that only lets users with the role in the state through.
///
/// Must run after [auth_guard], i.e. be added as a layer before it.
pub async fn role_guard(
    State(required_role): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, Error> {
    let Some(user) = request.extensions().get::<User>() else {
        tracing::error!("role_guard ran without an authenticated user, is auth_guard missing?");
        return Err(Error::MissingToken);
    };

    if user.role != required_role {
        tracing::warn!(
            "User {} with role \"{}\" tried to access {}",
            user.id,
            user.role,
            request.uri()
        );
        return Err(Error::Forbidden(required_role));
    }

    Ok(next.run(request).await)
}
