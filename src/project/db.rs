//! Database operations for projects.

use rusqlite::{Connection, Row, params};

use crate::{
    Error,
    db::{
        FOREIGN_KEY_CONSTRAINT_FAILED, UNIQUE_CONSTRAINT_FAILED, created_at_now,
        is_constraint_error,
    },
    name::Name,
    pagination::{ListQuery, Page},
    project::{Project, ProjectId, domain::ProjectSortColumn},
};

/// Create a project and return it with its generated ID.
///
/// # Errors
/// Returns [Error::DuplicateProjectName] if another project has the same name, ignoring case.
pub fn create_project(name: Name, connection: &Connection) -> Result<Project, Error> {
    let created_at = created_at_now();

    connection
        .execute(
            "INSERT INTO project (name, name_key, created_at) VALUES (?1, ?2, ?3)",
            params![name.as_ref(), name.folded(), created_at],
        )
        .map_err(|error| map_unique_error(error, &name))?;

    let id = connection.last_insert_rowid();

    Ok(Project {
        id,
        name,
        created_at,
    })
}

/// Retrieve a single project by ID.
pub fn get_project(project_id: ProjectId, connection: &Connection) -> Result<Project, Error> {
    connection
        .prepare("SELECT id, name, created_at FROM project WHERE id = :id")?
        .query_row(&[(":id", &project_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve one page of the projects whose name contains the search string.
pub(crate) fn list_projects(
    query: &ListQuery<ProjectSortColumn>,
    connection: &Connection,
) -> Result<Page<Project>, Error> {
    // The search string is already case folded.
    const FILTER: &str = "WHERE (?1 IS NULL OR name_key LIKE '%' || ?1 || '%')";

    let total: i64 = connection.query_row(
        &format!("SELECT COUNT(id) FROM project {FILTER}"),
        params![query.search],
        |row| row.get(0),
    )?;

    let (limit, offset) = query.limit_and_offset();
    let items = connection
        .prepare(&format!(
            "SELECT id, name, created_at FROM project {FILTER} {} LIMIT ?2 OFFSET ?3",
            query.order_by_clause("id")
        ))?
        .query_map(params![query.search, limit, offset], map_row)?
        .map(|maybe_project| maybe_project.map_err(Error::from))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        total: total as u64,
        items,
    })
}

/// Rename a project.
///
/// # Errors
/// Returns [Error::UpdateMissingProject] if the project doesn't exist, or
/// [Error::DuplicateProjectName] if another project already uses the name.
pub fn update_project(
    project_id: ProjectId,
    new_name: Name,
    connection: &Connection,
) -> Result<Project, Error> {
    let rows_affected = connection
        .execute(
            "UPDATE project SET name = ?1, name_key = ?2 WHERE id = ?3",
            params![new_name.as_ref(), new_name.folded(), project_id],
        )
        .map_err(|error| map_unique_error(error, &new_name))?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingProject);
    }

    get_project(project_id, connection)
}

/// Delete a project by ID.
///
/// # Errors
/// Returns [Error::DeleteMissingProject] if the project doesn't exist, or
/// [Error::ProjectInUse] if transactions still refer to it.
pub fn delete_project(project_id: ProjectId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection
        .execute("DELETE FROM project WHERE id = ?1", [project_id])
        .map_err(|error| {
            if is_constraint_error(&error, FOREIGN_KEY_CONSTRAINT_FAILED) {
                Error::ProjectInUse
            } else {
                error.into()
            }
        })?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingProject);
    }

    Ok(())
}

/// Initialize the project table.
///
/// Project names are unique regardless of letter case. SQLite only folds
/// ASCII letters, so uniqueness is enforced on `name_key`, the name
/// lowercased with Unicode rules.
pub fn create_project_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS project (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL COLLATE NOCASE,
            name_key TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

fn map_unique_error(error: rusqlite::Error, name: &Name) -> Error {
    if is_constraint_error(&error, UNIQUE_CONSTRAINT_FAILED) {
        Error::DuplicateProjectName(name.to_string())
    } else {
        error.into()
    }
}

fn map_row(row: &Row) -> Result<Project, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let created_at = row.get(2)?;

    Ok(Project {
        id,
        name: Name::new_unchecked(&raw_name),
        created_at,
    })
}
