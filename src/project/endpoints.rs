//! Route handlers for listing, creating, updating and deleting projects.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    db::lock_connection,
    extract::{ApiJson, ApiPath, ApiQuery},
    name::Name,
    pagination::{ListParams, ListQuery, Page, PaginationConfig},
    project::{
        Project, ProjectId,
        db::{create_project, delete_project, get_project, list_projects, update_project},
        domain::ProjectData,
    },
};

/// The state needed to manage projects.
#[derive(Debug, Clone)]
pub struct ProjectState {
    /// The database connection for managing projects.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The default and maximum page sizes.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for ProjectState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// A route handler for searching, sorting and paging projects.
pub async fn list_projects_endpoint(
    State(state): State<ProjectState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Page<Project>>, Error> {
    let query = ListQuery::from_params(params, &state.pagination_config);
    let connection = lock_connection(&state.db_connection)?;

    list_projects(&query, &connection).map(Json)
}

/// A route handler for getting a single project.
pub async fn get_project_endpoint(
    State(state): State<ProjectState>,
    ApiPath(project_id): ApiPath<ProjectId>,
) -> Result<Json<Project>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_project(project_id, &connection).map(Json)
}

/// A route handler for creating a new project, responds with the created project.
pub async fn create_project_endpoint(
    State(state): State<ProjectState>,
    ApiJson(data): ApiJson<ProjectData>,
) -> Result<Json<Project>, Error> {
    let name = Name::new(&data.name)?;
    let connection = lock_connection(&state.db_connection)?;

    let project = create_project(name, &connection)?;
    tracing::info!("Created project {} ({})", project.id, project.name);

    Ok(Json(project))
}

/// A route handler for renaming a project, responds with the updated project.
pub async fn update_project_endpoint(
    State(state): State<ProjectState>,
    ApiPath(project_id): ApiPath<ProjectId>,
    ApiJson(data): ApiJson<ProjectData>,
) -> Result<Json<Project>, Error> {
    let name = Name::new(&data.name)?;
    let connection = lock_connection(&state.db_connection)?;

    update_project(project_id, name, &connection).map(Json)
}

/// A route handler for deleting a project.
pub async fn delete_project_endpoint(
    State(state): State<ProjectState>,
    ApiPath(project_id): ApiPath<ProjectId>,
) -> Result<Json<Value>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_project(project_id, &connection)?;
    tracing::info!("Deleted project {project_id}");

    Ok(Json(json!({ "message": "Project deleted." })))
}
