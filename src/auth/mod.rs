//! Bearer token authentication and role checks.

mod current_user;
mod log_in;
mod middleware;
mod token;

pub use current_user::{admin_only_endpoint, get_me_endpoint};
pub use log_in::{AccessToken, LogInData, log_in_endpoint};
pub use middleware::{AuthState, auth_guard, role_guard};
pub use token::{Claims, DEFAULT_TOKEN_DURATION, JwtKeys, decode_token, encode_token};
