//! Endpoints for listing categories.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Query, State},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::{Category, CategoryStats, get_all_categories, get_categories_with_stats},
    db::lock_connection,
    transaction::DateRange,
};

/// The state needed to list categories.
#[derive(Debug, Clone)]
pub struct CategoriesState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoriesState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List all categories by name.
pub async fn get_categories_endpoint(
    State(state): State<CategoriesState>,
) -> Result<Json<Vec<Category>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_all_categories(&connection).map(Json)
}

/// List all categories with their transaction count and total, optionally
/// limited to a date range.
pub async fn get_categories_with_stats_endpoint(
    State(state): State<CategoriesState>,
    Query(range): Query<DateRange>,
) -> Result<Json<Vec<CategoryStats>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_categories_with_stats(&range, &connection).map(Json)
}
