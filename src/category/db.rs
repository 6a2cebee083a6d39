//! Database operations for categories.

use rusqlite::{Connection, Row, params};

use crate::{
    Error,
    category::{Category, CategoryId, EntryType, domain::CategorySortColumn},
    db::{
        FOREIGN_KEY_CONSTRAINT_FAILED, UNIQUE_CONSTRAINT_FAILED, created_at_now,
        is_constraint_error,
    },
    name::Name,
    pagination::{ListQuery, Page},
};

/// Create a category and return it with its generated ID.
///
/// # Errors
/// Returns [Error::DuplicateCategory] if a category with the same type and
/// name (ignoring case) already exists.
pub fn create_category(
    kind: EntryType,
    name: Name,
    connection: &Connection,
) -> Result<Category, Error> {
    let created_at = created_at_now();

    connection
        .execute(
            "INSERT INTO category (type, name, name_key, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![kind, name.as_ref(), name.folded(), created_at],
        )
        .map_err(|error| map_unique_error(error, kind, &name))?;

    Ok(Category {
        id: connection.last_insert_rowid(),
        kind,
        name,
        created_at,
    })
}

/// Retrieve a single category by ID.
pub fn get_category(category_id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, type, name, created_at FROM category WHERE id = :id")?
        .query_row(&[(":id", &category_id)], map_row)
        .map_err(|error| error.into())
}

pub(crate) fn list_categories(
    query: &ListQuery<CategorySortColumn>,
    connection: &Connection,
) -> Result<Page<Category>, Error> {
    const FILTER: &str = "WHERE (?1 IS NULL OR name_key LIKE '%' || ?1 || '%')";

    let total: i64 = connection.query_row(
        &format!("SELECT COUNT(id) FROM category {FILTER}"),
        params![query.search],
        |row| row.get(0),
    )?;

    let (limit, offset) = query.limit_and_offset();
    let items = connection
        .prepare(&format!(
            "SELECT id, type, name, created_at FROM category {FILTER} {} LIMIT ?2 OFFSET ?3",
            query.order_by_clause("id")
        ))?
        .query_map(params![query.search, limit, offset], map_row)?
        .map(|maybe_category| maybe_category.map_err(Error::from))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        total: total as u64,
        items,
    })
}

/// Replace the type and name of a category.
///
/// # Errors
/// Returns [Error::UpdateMissingCategory] if the category doesn't exist, or
/// [Error::DuplicateCategory] if another category already has the type and name.
pub fn update_category(
    category_id: CategoryId,
    kind: EntryType,
    name: Name,
    connection: &Connection,
) -> Result<Category, Error> {
    let rows_affected = connection
        .execute(
            "UPDATE category SET type = ?1, name = ?2, name_key = ?3 WHERE id = ?4",
            params![kind, name.as_ref(), name.folded(), category_id],
        )
        .map_err(|error| map_unique_error(error, kind, &name))?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    get_category(category_id, connection)
}

/// Delete a category by ID.
///
/// # Errors
/// Returns [Error::DeleteMissingCategory] if the category doesn't exist, or
/// [Error::CategoryInUse] if transactions still refer to it.
pub fn delete_category(category_id: CategoryId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection
        .execute("DELETE FROM category WHERE id = ?1", [category_id])
        .map_err(|error| {
            if is_constraint_error(&error, FOREIGN_KEY_CONSTRAINT_FAILED) {
                Error::CategoryInUse
            } else {
                error.into()
            }
        })?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    Ok(())
}

/// Initialize the category table.
///
/// `name_key` holds the case folded name, a type may not have two categories
/// with the same key.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            type TEXT NOT NULL CHECK (type IN ('gelir', 'gider')),
            name TEXT NOT NULL COLLATE NOCASE,
            name_key TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(type, name_key)
        );

        CREATE INDEX IF NOT EXISTS idx_category_name ON category(name);",
    )?;

    Ok(())
}

fn map_unique_error(error: rusqlite::Error, kind: EntryType, name: &Name) -> Error {
    if is_constraint_error(&error, UNIQUE_CONSTRAINT_FAILED) {
        Error::DuplicateCategory {
            kind,
            name: name.to_string(),
        }
    } else {
        error.into()
    }
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_name: String = row.get(2)?;

    Ok(Category {
        id: row.get(0)?,
        kind: row.get(1)?,
        name: Name::new_unchecked(&raw_name),
        created_at: row.get(3)?,
    })
}
