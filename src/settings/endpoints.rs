//! The REST endpoints for reading and writing the current user's settings.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::{
    AppState, Error,
    auth::UserID,
    budget::{BUDGET_CYCLE_SETTING_KEY, BudgetCycleStartDay},
    db::lock_connection,
    settings::{delete_setting, get_setting, get_settings, upsert_setting},
};

/// The state needed to access settings.
#[derive(Debug, Clone)]
pub struct SettingsState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SettingsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for updating a setting.
#[derive(Debug, Deserialize)]
pub struct SettingData {
    pub value: Option<Value>,
}

/// Get all settings of the current user as one object.
pub async fn get_settings_endpoint(
    State(state): State<SettingsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Map<String, Value>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_settings(user_id, &connection).map(Json)
}

/// Get the value of one setting.
pub async fn get_setting_endpoint(
    State(state): State<SettingsState>,
    Extension(user_id): Extension<UserID>,
    Path(key): Path<String>,
) -> Result<Json<Value>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_setting(user_id, &key, &connection).map(Json)
}

/// Create or replace a setting. Known keys have their values validated.
pub async fn put_setting_endpoint(
    State(state): State<SettingsState>,
    Extension(user_id): Extension<UserID>,
    Path(key): Path<String>,
    Json(data): Json<SettingData>,
) -> Result<Json<Value>, Error> {
    let value = data.value.ok_or(Error::MissingSettingValue)?;

    if key == BUDGET_CYCLE_SETTING_KEY {
        BudgetCycleStartDay::from_setting_value(&value)?;
    }

    let connection = lock_connection(&state.db_connection)?;
    upsert_setting(user_id, &key, &value, &connection)?;

    Ok(Json(json!({ "key": key, "value": value })))
}

/// Delete a setting.
pub async fn delete_setting_endpoint(
    State(state): State<SettingsState>,
    Extension(user_id): Extension<UserID>,
    Path(key): Path<String>,
) -> Result<Json<Value>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_setting(user_id, &key, &connection)?;

    Ok(Json(json!({ "message": "Setting deleted" })))
}
