//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/projects/{project_id}', use [format_endpoint].

/// The route for checking that the database answers.
pub const PING_DB: &str = "/ping-db";
/// The route for registering a user.
pub const REGISTER: &str = "/register";
/// The route for logging in a user.
pub const LOG_IN: &str = "/login";
/// The route for getting the authenticated user.
pub const ME: &str = "/me";
/// The route only administrators may access.
pub const ADMIN_ONLY: &str = "/admin-only";
/// The route for importing today's exchange rates.
pub const EXCHANGE_RATES: &str = "/exchange-rates";
/// The route for listing stored exchange rates.
pub const STORED_EXCHANGE_RATES: &str = "/exchange-rates/stored";
/// The route for converting an amount into the local currency.
pub const CONVERT_CURRENCY: &str = "/exchange-rates/convert";
/// The route for importing the exchange rates of a range of days.
pub const BACKFILL_EXCHANGE_RATES: &str = "/exchange-rates/backfill";
/// The route to list and create projects.
pub const PROJECTS: &str = "/projects";
/// The route to access a single project.
pub const PROJECT: &str = "/projects/{project_id}";
/// The route to list and create categories.
pub const CATEGORIES: &str = "/categories";
/// The route to access a single category.
pub const CATEGORY: &str = "/categories/{category_id}";
/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/transactions";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/transactions/{transaction_id}";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/projects/{project_id}', '{project_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
