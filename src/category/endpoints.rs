//! Route handlers for listing, creating, updating and deleting categories.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    category::{
        Category, CategoryId, EntryType,
        db::{create_category, delete_category, get_category, list_categories, update_category},
        domain::CategoryData,
    },
    db::lock_connection,
    extract::{ApiJson, ApiPath, ApiQuery},
    name::Name,
    pagination::{ListParams, ListQuery, Page, PaginationConfig},
};

/// The state needed to manage categories.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection for managing categories.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The default and maximum page sizes.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

fn parse_category_data(data: &CategoryData) -> Result<(EntryType, Name), Error> {
    let kind = data.kind.parse()?;
    let name = Name::new(&data.name)?;

    Ok((kind, name))
}

/// A route handler for searching, sorting and paging categories.
pub async fn list_categories_endpoint(
    State(state): State<CategoryState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Page<Category>>, Error> {
    let query = ListQuery::from_params(params, &state.pagination_config);
    let connection = lock_connection(&state.db_connection)?;

    list_categories(&query, &connection).map(Json)
}

/// A route handler for getting a single category.
pub async fn get_category_endpoint(
    State(state): State<CategoryState>,
    ApiPath(category_id): ApiPath<CategoryId>,
) -> Result<Json<Category>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_category(category_id, &connection).map(Json)
}

/// A route handler for creating a new category, responds with the created category.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    ApiJson(data): ApiJson<CategoryData>,
) -> Result<Json<Category>, Error> {
    let (kind, name) = parse_category_data(&data)?;
    let connection = lock_connection(&state.db_connection)?;

    let category = create_category(kind, name, &connection)?;
    tracing::info!(
        "Created {} category {} ({})",
        category.kind,
        category.id,
        category.name
    );

    Ok(Json(category))
}

/// A route handler for replacing the type and name of a category.
pub async fn update_category_endpoint(
    State(state): State<CategoryState>,
    ApiPath(category_id): ApiPath<CategoryId>,
    ApiJson(data): ApiJson<CategoryData>,
) -> Result<Json<Category>, Error> {
    let (kind, name) = parse_category_data(&data)?;
    let connection = lock_connection(&state.db_connection)?;

    update_category(category_id, kind, name, &connection).map(Json)
}

/// A route handler for deleting a category.
pub async fn delete_category_endpoint(
    State(state): State<CategoryState>,
    ApiPath(category_id): ApiPath<CategoryId>,
) -> Result<Json<Value>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_category(category_id, &connection)?;
    tracing::info!("Deleted category {category_id}");

    Ok(Json(json!({ "message": "Category deleted." })))
}
