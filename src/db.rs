//! Creates the database schema and seeds the data a fresh install needs.

use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use serde_json::json;

use crate::{
    Error,
    auth::{PasswordHash, User, count_users, create_user, create_user_table},
    budget::{BUDGET_CYCLE_SETTING_KEY, BudgetCycleStartDay, create_budget_table},
    category::{create_category_table, seed_default_categories},
    csv_import::create_import_batch_table,
    settings::{create_setting_table, upsert_setting},
    transaction::create_transaction_table,
};

/// The key of the setting that toggles the dashboard's dark theme.
const DARK_MODE_SETTING_KEY: &str = "dark_mode";

/// Lock the shared connection, logging a poisoned lock.
pub fn lock_connection(
    db_connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}

/// Create the application tables if they do not exist and seed the default categories.
///
/// Foreign key enforcement is switched on for `connection`.
///
/// # Errors
/// Returns an error if a table cannot be created or there is some other SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Must be set outside of a transaction to take effect.
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;

    let transaction = connection.unchecked_transaction()?;

    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_import_batch_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_budget_table(&transaction)?;
    create_setting_table(&transaction)?;
    seed_default_categories(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Create the first user and their default settings if the database has no users yet.
///
/// Returns the new user, or `None` if a user already existed.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn ensure_default_user(
    username: &str,
    email: &str,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<Option<User>, Error> {
    if count_users(connection)? > 0 {
        return Ok(None);
    }

    let transaction = connection.unchecked_transaction()?;

    let user = create_user(username, email, password_hash, &transaction)?;
    upsert_setting(
        user.id,
        BUDGET_CYCLE_SETTING_KEY,
        &BudgetCycleStartDay::default().to_setting_value(),
        &transaction,
    )?;
    upsert_setting(
        user.id,
        DARK_MODE_SETTING_KEY,
        &json!({ "enabled": true }),
        &transaction,
    )?;

    transaction.commit()?;
    tracing::info!("Created default user {username}");

    Ok(Some(user))
}
