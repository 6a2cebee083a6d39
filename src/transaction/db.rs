//! Database operations for transactions.

use rusqlite::{Connection, Row, params};

use crate::{
    Error,
    category::get_category,
    db::created_at_now,
    exchange_rate::{LocalCurrency, convert_to_local},
    money::{get_decimal, get_optional_decimal},
    pagination::{ListQuery, Page},
    project::get_project,
    transaction::domain::{NewTransaction, Transaction, TransactionId, TransactionSortColumn},
};

const SELECT_TRANSACTION: &str = "SELECT t.id, t.type, t.project_id, p.name, t.category_id, \
     c.name, t.date, t.amount, t.currency, t.description, t.local_total, t.created_at \
     FROM \"transaction\" t \
     INNER JOIN project p ON p.id = t.project_id \
     INNER JOIN category c ON c.id = t.category_id";

/// Check that the referenced project and category exist and compute the local total.
fn prepare_write(
    transaction: &NewTransaction,
    local_currency: &LocalCurrency,
    connection: &Connection,
) -> Result<Option<String>, Error> {
    get_project(transaction.project_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidProject(transaction.project_id),
        error => error,
    })?;
    get_category(transaction.category_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidCategory(transaction.category_id),
        error => error,
    })?;

    let conversion = convert_to_local(
        transaction.amount,
        &transaction.currency,
        transaction.date,
        local_currency,
        connection,
    )?;

    Ok(conversion.map(|conversion| conversion.local_total.to_string()))
}

/// Create a transaction and return it with its generated ID and local total.
///
/// # Errors
/// Returns [Error::InvalidProject] or [Error::InvalidCategory] if the
/// referenced project or category does not exist.
pub fn create_transaction(
    transaction: NewTransaction,
    local_currency: &LocalCurrency,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let local_total = prepare_write(&transaction, local_currency, connection)?;

    connection.execute(
        "INSERT INTO \"transaction\" \
         (type, project_id, category_id, date, amount, currency, description, local_total, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            transaction.kind,
            transaction.project_id,
            transaction.category_id,
            transaction.date,
            transaction.amount.to_string(),
            transaction.currency,
            transaction.description,
            local_total,
            created_at_now(),
        ],
    )?;

    get_transaction(connection.last_insert_rowid(), connection)
}

/// Retrieve a single transaction by ID.
pub fn get_transaction(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!("{SELECT_TRANSACTION} WHERE t.id = :id"))?
        .query_row(&[(":id", &transaction_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve one page of the transactions matching the search string.
///
/// The search matches the project name, the category name, the type, the
/// currency and the description.
pub(crate) fn list_transactions(
    query: &ListQuery<TransactionSortColumn>,
    connection: &Connection,
) -> Result<Page<Transaction>, Error> {
    // The search string is already case folded, type and currency are ASCII.
    const FILTER: &str = "WHERE (?1 IS NULL \
         OR p.name_key LIKE '%' || ?1 || '%' \
         OR c.name_key LIKE '%' || ?1 || '%' \
         OR t.type LIKE '%' || ?1 || '%' \
         OR t.currency LIKE '%' || ?1 || '%' \
         OR fold_case(t.description) LIKE '%' || ?1 || '%')";

    let total: i64 = connection.query_row(
        &format!(
            "SELECT COUNT(t.id) FROM \"transaction\" t \
             INNER JOIN project p ON p.id = t.project_id \
             INNER JOIN category c ON c.id = t.category_id {FILTER}"
        ),
        params![query.search],
        |row| row.get(0),
    )?;

    let (limit, offset) = query.limit_and_offset();
    let items = connection
        .prepare(&format!(
            "{SELECT_TRANSACTION} {FILTER} {} LIMIT ?2 OFFSET ?3",
            query.order_by_clause("t.id")
        ))?
        .query_map(params![query.search, limit, offset], map_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        total: total as u64,
        items,
    })
}

/// Replace every field of a transaction and recompute its local total.
///
/// # Errors
/// Returns [Error::UpdateMissingTransaction] if the transaction doesn't exist,
/// or [Error::InvalidProject] / [Error::InvalidCategory] if the referenced
/// project or category does not exist. A missing transaction is reported
/// before invalid references.
pub fn update_transaction(
    transaction_id: TransactionId,
    transaction: NewTransaction,
    local_currency: &LocalCurrency,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let exists: bool = connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM \"transaction\" WHERE id = ?1)",
        [transaction_id],
        |row| row.get(0),
    )?;

    if !exists {
        return Err(Error::UpdateMissingTransaction);
    }

    let local_total = prepare_write(&transaction, local_currency, connection)?;

    let rows_affected = connection.execute(
        "UPDATE \"transaction\" SET type = ?1, project_id = ?2, category_id = ?3, date = ?4, \
         amount = ?5, currency = ?6, description = ?7, local_total = ?8 WHERE id = ?9",
        params![
            transaction.kind,
            transaction.project_id,
            transaction.category_id,
            transaction.date,
            transaction.amount.to_string(),
            transaction.currency,
            transaction.description,
            local_total,
            transaction_id,
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    get_transaction(transaction_id, connection)
}

/// Delete a transaction by ID.
///
/// # Errors
/// Returns [Error::DeleteMissingTransaction] if the transaction doesn't exist.
pub fn delete_transaction(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected =
        connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", [transaction_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

/// Initialize the transaction table.
///
/// Projects and categories that transactions refer to cannot be deleted.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            type TEXT NOT NULL CHECK (type IN ('gelir', 'gider')),
            project_id INTEGER NOT NULL REFERENCES project(id) ON DELETE RESTRICT,
            category_id INTEGER NOT NULL REFERENCES category(id) ON DELETE RESTRICT,
            date TEXT NOT NULL,
            amount TEXT NOT NULL,
            currency TEXT NOT NULL,
            description TEXT,
            local_total TEXT,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_project ON \"transaction\"(project_id)",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_category ON \"transaction\"(category_id)",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_date ON \"transaction\"(date)",
        (),
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        kind: row.get(1)?,
        project_id: row.get(2)?,
        project_name: row.get(3)?,
        category_id: row.get(4)?,
        category_name: row.get(5)?,
        date: row.get(6)?,
        amount: get_decimal(row, 7)?,
        currency: row.get(8)?,
        description: row.get(9)?,
        local_total: get_optional_decimal(row, 10)?,
        created_at: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use time::macros::date;

    use crate::{
        Error,
        category::{EntryType, create_category},
        db::initialize,
        exchange_rate::{CurrencyCode, LocalCurrency, upsert_exchange_rate},
        name::Name,
        pagination::{ListParams, ListQuery, PaginationConfig},
        project::{create_project, delete_project},
        transaction::domain::{NewTransaction, TransactionSortColumn},
    };

    use super::{
        create_transaction, delete_transaction, get_transaction, list_transactions,
        update_transaction,
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        create_project(Name::new_unchecked("Bina"), &connection).unwrap();
        create_project(Name::new_unchecked("Yol"), &connection).unwrap();
        create_category(EntryType::Expense, Name::new_unchecked("Malzeme"), &connection).unwrap();
        connection
    }

    fn decimal(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn new_transaction(amount: &str, currency: &str) -> NewTransaction {
        NewTransaction {
            kind: EntryType::Expense,
            project_id: 1,
            category_id: 1,
            date: date!(2024 - 01 - 15),
            amount: decimal(amount),
            currency: CurrencyCode::new(currency).unwrap(),
            description: None,
        }
    }

    fn query(params: ListParams) -> ListQuery<TransactionSortColumn> {
        ListQuery::from_params(params, &PaginationConfig::default())
    }

    #[test]
    fn local_currency_total_is_the_amount() {
        let connection = get_test_connection();

        let transaction = create_transaction(
            new_transaction("150.25", "TRY"),
            &LocalCurrency::default(),
            &connection,
        )
        .unwrap();

        assert_eq!(transaction.local_total, Some(decimal("150.25")));
        assert_eq!(transaction.project_name, "Bina");
        assert_eq!(transaction.category_name, "Malzeme");
        assert_eq!(Ok(transaction.clone()), get_transaction(transaction.id, &connection));
    }

    #[test]
    fn foreign_total_uses_latest_rate_on_or_before_date() {
        let connection = get_test_connection();
        let usd = CurrencyCode::new("USD").unwrap();
        upsert_exchange_rate(&usd, decimal("27.00"), date!(2024 - 01 - 10), &connection).unwrap();
        upsert_exchange_rate(&usd, decimal("27.50"), date!(2024 - 01 - 15), &connection).unwrap();
        upsert_exchange_rate(&usd, decimal("99.00"), date!(2024 - 01 - 16), &connection).unwrap();

        let transaction = create_transaction(
            new_transaction("100", "USD"),
            &LocalCurrency::default(),
            &connection,
        )
        .unwrap();

        assert_eq!(transaction.local_total, Some(decimal("2750.00")));
    }

    #[test]
    fn foreign_total_is_none_without_rate() {
        let connection = get_test_connection();

        let transaction = create_transaction(
            new_transaction("100", "CHF"),
            &LocalCurrency::default(),
            &connection,
        )
        .unwrap();

        assert_eq!(transaction.local_total, None);
    }

    #[test]
    fn create_rejects_missing_project_and_category() {
        let connection = get_test_connection();

        let missing_project = create_transaction(
            NewTransaction {
                project_id: 99,
                ..new_transaction("1", "TRY")
            },
            &LocalCurrency::default(),
            &connection,
        );
        let missing_category = create_transaction(
            NewTransaction {
                category_id: 99,
                ..new_transaction("1", "TRY")
            },
            &LocalCurrency::default(),
            &connection,
        );

        assert_eq!(missing_project, Err(Error::InvalidProject(99)));
        assert_eq!(missing_category, Err(Error::InvalidCategory(99)));
    }

    #[test]
    fn update_recomputes_local_total() {
        let connection = get_test_connection();
        let local = LocalCurrency::default();
        let eur = CurrencyCode::new("EUR").unwrap();
        upsert_exchange_rate(&eur, decimal("32.8945"), date!(2024 - 01 - 15), &connection)
            .unwrap();
        let transaction =
            create_transaction(new_transaction("10", "TRY"), &local, &connection).unwrap();

        let updated = update_transaction(
            transaction.id,
            NewTransaction {
                project_id: 2,
                ..new_transaction("10", "EUR")
            },
            &local,
            &connection,
        )
        .unwrap();

        assert_eq!(updated.local_total, Some(decimal("328.95")));
        assert_eq!(updated.project_name, "Yol");
        assert_eq!(updated.created_at, transaction.created_at);
    }

    #[test]
    fn update_missing_transaction_returns_error() {
        let connection = get_test_connection();

        let result = update_transaction(
            42,
            new_transaction("1", "TRY"),
            &LocalCurrency::default(),
            &connection,
        );

        assert_eq!(result, Err(Error::UpdateMissingTransaction));
    }

    #[test]
    fn update_missing_transaction_with_invalid_references_returns_missing_error() {
        let connection = get_test_connection();

        let result = update_transaction(
            42,
            NewTransaction {
                project_id: 99,
                category_id: 99,
                ..new_transaction("1", "TRY")
            },
            &LocalCurrency::default(),
            &connection,
        );

        assert_eq!(result, Err(Error::UpdateMissingTransaction));
    }

    #[test]
    fn delete_transaction_succeeds_and_then_fails() {
        let connection = get_test_connection();
        let transaction = create_transaction(
            new_transaction("1", "TRY"),
            &LocalCurrency::default(),
            &connection,
        )
        .unwrap();

        assert_eq!(delete_transaction(transaction.id, &connection), Ok(()));
        assert_eq!(
            delete_transaction(transaction.id, &connection),
            Err(Error::DeleteMissingTransaction)
        );
    }

    #[test]
    fn referenced_project_cannot_be_deleted() {
        let connection = get_test_connection();
        create_transaction(
            new_transaction("1", "TRY"),
            &LocalCurrency::default(),
            &connection,
        )
        .unwrap();

        assert_eq!(delete_project(1, &connection), Err(Error::ProjectInUse));
        assert!(get_transaction(1, &connection).is_ok());
    }

    #[test]
    fn list_searches_joined_names_and_sorts_numerically() {
        let connection = get_test_connection();
        let local = LocalCurrency::default();
        for (amount, project_id) in [("9", 1), ("100", 2), ("20", 2)] {
            create_transaction(
                NewTransaction {
                    project_id,
                    ..new_transaction(amount, "TRY")
                },
                &local,
                &connection,
            )
            .unwrap();
        }

        let page = list_transactions(
            &query(ListParams {
                search: Some("yol".to_owned()),
                sort_by: Some("amount".to_owned()),
                ..Default::default()
            }),
            &connection,
        )
        .unwrap();

        let amounts: Vec<Decimal> = page.items.iter().map(|t| t.amount).collect();
        assert_eq!(page.total, 2);
        assert_eq!(amounts, [decimal("20"), decimal("100")]);
    }

    #[test]
    fn list_search_folds_non_ascii_letters() {
        let connection = get_test_connection();
        let local = LocalCurrency::default();
        create_project(Name::new_unchecked("Şantiye"), &connection).unwrap();
        create_transaction(
            NewTransaction {
                project_id: 3,
                ..new_transaction("5", "TRY")
            },
            &local,
            &connection,
        )
        .unwrap();
        create_transaction(
            NewTransaction {
                description: Some("ÇİMENTO alımı".to_owned()),
                ..new_transaction("7", "TRY")
            },
            &local,
            &connection,
        )
        .unwrap();

        let by_project = list_transactions(
            &query(ListParams {
                search: Some("şan".to_owned()),
                ..Default::default()
            }),
            &connection,
        )
        .unwrap();
        let by_description = list_transactions(
            &query(ListParams {
                search: Some("çimento".to_owned()),
                ..Default::default()
            }),
            &connection,
        )
        .unwrap();

        assert_eq!(by_project.total, 1);
        assert_eq!(by_project.items[0].project_name, "Şantiye");
        assert_eq!(by_description.total, 1);
        assert_eq!(by_description.items[0].amount, decimal("7"));
    }

    #[test]
    fn list_with_unknown_sort_column_orders_by_id() {
        let connection = get_test_connection();
        let local = LocalCurrency::default();
        for amount in ["3", "1", "2"] {
            create_transaction(new_transaction(amount, "TRY"), &local, &connection).unwrap();
        }

        let page = list_transactions(
            &query(ListParams {
                sort_by: Some("foo".to_owned()),
                ..Default::default()
            }),
            &connection,
        )
        .unwrap();

        let ids: Vec<i64> = page.items.iter().map(|t| t.id).collect();
        assert_eq!(ids, [1, 2, 3]);
    }
}
