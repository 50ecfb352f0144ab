//! Per-user settings stored as JSON values.

use rusqlite::{Connection, OptionalExtension};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::{Error, auth::UserID};

/// Initialize the setting table.
pub fn create_setting_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS setting (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(user_id, key),
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Get all of a user's settings as an object mapping keys to values.
pub fn get_settings(user_id: UserID, connection: &Connection) -> Result<Map<String, Value>, Error> {
    connection
        .prepare("SELECT key, value FROM setting WHERE user_id = ?1 ORDER BY key")?
        .query_map([user_id.as_i64()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Value>(1)?))
        })?
        .map(|maybe_setting| maybe_setting.map_err(|error| error.into()))
        .collect()
}

/// Get the value of a single setting.
///
/// # Errors
/// Returns [Error::MissingSetting] if the user has no setting with `key`.
pub fn get_setting(user_id: UserID, key: &str, connection: &Connection) -> Result<Value, Error> {
    connection
        .query_row(
            "SELECT value FROM setting WHERE user_id = ?1 AND key = ?2",
            (user_id.as_i64(), key),
            |row| row.get(0),
        )
        .optional()?
        .ok_or(Error::MissingSetting)
}

/// Create or replace a setting.
pub fn upsert_setting(
    user_id: UserID,
    key: &str,
    value: &Value,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO setting (user_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(user_id, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        (user_id.as_i64(), key, value, OffsetDateTime::now_utc()),
    )?;

    Ok(())
}

/// Delete a setting.
///
/// # Errors
/// Returns [Error::MissingSetting] if the user has no setting with `key`.
pub fn delete_setting(user_id: UserID, key: &str, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM setting WHERE user_id = ?1 AND key = ?2",
        (user_id.as_i64(), key),
    )?;

    if rows_affected == 0 {
        return Err(Error::MissingSetting);
    }

    Ok(())
}

#[cfg(test)]
mod setting_query_tests {
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        Error,
        auth::{PasswordHash, User, create_user},
        db::initialize,
        settings::{delete_setting, get_setting, get_settings, upsert_setting},
    };

    fn get_test_db() -> (Connection, User) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            "alice",
            "alice@example.com",
            &PasswordHash::new_unchecked("hunter2"),
            &connection,
        )
        .unwrap();

        (connection, user)
    }

    #[test]
    fn upsert_replaces_value() {
        let (connection, user) = get_test_db();

        upsert_setting(user.id, "dark_mode", &json!({ "enabled": true }), &connection).unwrap();
        upsert_setting(user.id, "dark_mode", &json!({ "enabled": false }), &connection).unwrap();

        assert_eq!(
            get_setting(user.id, "dark_mode", &connection),
            Ok(json!({ "enabled": false }))
        );
        assert_eq!(get_settings(user.id, &connection).unwrap().len(), 1);
    }

    #[test]
    fn settings_are_per_user() {
        let (connection, alice) = get_test_db();
        let bob = create_user(
            "bob",
            "bob@example.com",
            &PasswordHash::new_unchecked("hunter3"),
            &connection,
        )
        .unwrap();
        upsert_setting(alice.id, "currency", &json!("IDR"), &connection).unwrap();

        assert_eq!(
            get_setting(bob.id, "currency", &connection),
            Err(Error::MissingSetting)
        );
        assert!(get_settings(bob.id, &connection).unwrap().is_empty());
    }

    #[test]
    fn get_settings_maps_keys_to_values() {
        let (connection, user) = get_test_db();
        upsert_setting(user.id, "a", &json!(1), &connection).unwrap();
        upsert_setting(user.id, "b", &json!([1, 2]), &connection).unwrap();

        let settings = get_settings(user.id, &connection).unwrap();

        assert_eq!(settings["a"], json!(1));
        assert_eq!(settings["b"], json!([1, 2]));
    }

    #[test]
    fn delete_missing_setting_fails() {
        let (connection, user) = get_test_db();
        upsert_setting(user.id, "a", &json!(1), &connection).unwrap();

        assert_eq!(delete_setting(user.id, "a", &connection), Ok(()));
        assert_eq!(
            delete_setting(user.id, "a", &connection),
            Err(Error::MissingSetting)
        );
    }
}
