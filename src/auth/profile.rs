//! Handlers for the logged in user's own account.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    auth::{
        PasswordHash, UserID, UserProfile, ValidatedPassword, get_user_by_id, update_password,
    },
    db::lock_connection,
};

/// The state needed for the account handlers.
#[derive(Debug, Clone)]
pub struct ProfileState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The bcrypt cost for hashing new passwords.
    pub hash_cost: u32,
}

impl FromRef<AppState> for ProfileState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            hash_cost: PasswordHash::DEFAULT_COST,
        }
    }
}

/// Get the profile of the logged in user.
pub async fn get_me(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<UserProfile>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_user_by_id(user_id, &connection)
        .map(UserProfile::from)
        .map(Json)
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordData {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Replace the logged in user's password after checking their current one.
///
/// # Errors
///
/// - [Error::MissingFields] if either password is empty.
/// - [Error::InvalidCredentials] if the current password is wrong.
/// - [Error::TooWeak] if the new password is too easy to guess.
pub async fn post_change_password(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserID>,
    Json(data): Json<ChangePasswordData>,
) -> Result<Json<Value>, Error> {
    let current_password = data.current_password.unwrap_or_default();
    let new_password = data.new_password.unwrap_or_default();
    if current_password.is_empty() || new_password.is_empty() {
        return Err(Error::MissingFields(
            "current_password, new_password".to_owned(),
        ));
    }

    let new_password = ValidatedPassword::new(&new_password)?;

    let connection = lock_connection(&state.db_connection)?;

    let user = get_user_by_id(user_id, &connection)?;
    if !user.password_hash.verify(&current_password)? {
        return Err(Error::InvalidCredentials);
    }

    let password_hash = PasswordHash::new(new_password, state.hash_cost)?;
    update_password(user_id, &password_hash, &connection)?;
    tracing::info!("Password changed for user {user_id}");

    Ok(Json(json!({ "message": "Password changed successfully" })))
}
