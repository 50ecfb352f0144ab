//! Handles log-in requests.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Value, json};
use time::Duration;

use crate::{
    AppState, Error,
    auth::{UserProfile, get_user_by_username, set_auth_cookie},
    db::lock_connection,
};

/// How long the auth cookie should last if the user selects "remember me" at log-in.
const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// The credentials submitted by the log-in form.
#[derive(Debug, Deserialize)]
pub struct LogInData {
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub remember_me: bool,
}

/// Handler for log-in requests.
///
/// On success the auth cookie is set and the user's profile is returned.
///
/// # Errors
///
/// - [Error::MissingFields] if the username or password is empty.
/// - [Error::InvalidCredentials] if there is no such user or the password is wrong.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Json(log_in_data): Json<LogInData>,
) -> Result<(PrivateCookieJar, Json<Value>), Error> {
    let username = log_in_data.username.unwrap_or_default();
    let password = log_in_data.password.unwrap_or_default();
    if username.is_empty() || password.is_empty() {
        return Err(Error::MissingFields("username, password".to_owned()));
    }

    let user = {
        let connection = lock_connection(&state.db_connection)?;

        get_user_by_username(&username, &connection)?
    };

    let Some(user) = user else {
        tracing::info!("Log in attempt for unknown user {username}");
        return Err(Error::InvalidCredentials);
    };

    if !user.password_hash.verify(&password)? {
        tracing::info!("Incorrect password for user {username}");
        return Err(Error::InvalidCredentials);
    }

    let cookie_duration = if log_in_data.remember_me {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    let jar = set_auth_cookie(jar, user.id, cookie_duration)?;

    Ok((jar, Json(json!({ "user": UserProfile::from(user) }))))
}
