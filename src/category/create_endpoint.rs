//! Defines the endpoint for creating a category.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    category::{Category, NewCategory, create_category},
    db::lock_connection,
};

/// The state needed to create a category.
#[derive(Debug, Clone)]
pub struct CreateCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a category.
#[derive(Debug, Deserialize)]
pub struct CategoryData {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
}

/// Create a category from a code and display name.
pub async fn create_category_endpoint(
    State(state): State<CreateCategoryState>,
    Json(data): Json<CategoryData>,
) -> Result<(StatusCode, Json<Category>), Error> {
    let new_category = NewCategory {
        code: data.code,
        name: data.name,
    }
    .validated()?;

    let connection = lock_connection(&state.db_connection)?;
    let category = create_category(new_category, &connection)?;

    Ok((StatusCode::CREATED, Json(category)))
}
