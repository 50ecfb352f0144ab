//! Defines the endpoint for renaming a category.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    category::{Category, update_category_name},
    db::lock_connection,
};

/// The state needed to edit a category.
#[derive(Debug, Clone)]
pub struct EditCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for renaming a category. The code cannot be changed.
#[derive(Debug, Deserialize)]
pub struct EditCategoryData {
    pub name: Option<String>,
}

/// Rename the category with the code in the path.
pub async fn edit_category_endpoint(
    State(state): State<EditCategoryState>,
    Path(code): Path<String>,
    Json(data): Json<EditCategoryData>,
) -> Result<Json<Category>, Error> {
    let name = data
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::MissingFields("name".to_owned()))?;

    let connection = lock_connection(&state.db_connection)?;

    update_category_name(&code, name, &connection).map(Json)
}
