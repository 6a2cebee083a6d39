//! Creates the application's database schema.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, Transaction, TransactionBehavior, functions::FunctionFlags};
use time::{Duration, OffsetDateTime};

use crate::{
    Error, category::create_category_table, exchange_rate::create_exchange_rate_table,
    name::fold_case, project::create_project_table, transaction::create_transaction_table,
    user::create_user_table,
};

/// Create all the tables for the domain models if they do not exist yet.
///
/// Foreign key enforcement is switched on for `connection`, deleting a
/// project or category that transactions still refer to is rejected by the
/// database. The `fold_case` SQL function used by searches is registered on
/// `connection`.
///
/// # Errors
/// Returns an error if a table could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;
    register_functions(connection)?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_project_table(&transaction)?;
    create_category_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_exchange_rate_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Register `fold_case(text)`, which lowercases text with Unicode rules.
/// SQLite's built-in `lower` only handles ASCII letters.
fn register_functions(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |context| {
            let text: Option<String> = context.get(0)?;

            Ok(text.map(|text| fold_case(&text)))
        },
    )
}

/// Acquire the shared database connection for the duration of the returned guard.
///
/// # Errors
/// Returns [Error::DatabaseLockError] if the lock is poisoned.
pub(crate) fn lock_connection(
    db_connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)
}

/// The current UTC time truncated to whole seconds, used for `created_at` columns.
pub(crate) fn created_at_now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();

    now - Duration::nanoseconds(now.nanosecond() as i64)
}

/// SQLite extended result code for a failed UNIQUE constraint.
pub(crate) const UNIQUE_CONSTRAINT_FAILED: i32 = 2067;

/// SQLite extended result code for a failed FOREIGN KEY constraint.
pub(crate) const FOREIGN_KEY_CONSTRAINT_FAILED: i32 = 787;

/// Whether `error` is a violation of the constraint with the extended result code `code`.
pub(crate) fn is_constraint_error(error: &rusqlite::Error, code: i32) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(sql_error, _) if sql_error.extended_code == code
    )
}
