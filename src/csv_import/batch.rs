//! Import batches record each committed CSV file.

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{Error, auth::UserID, database_id::ImportBatchId};

/// The number of batches returned by [get_import_history].
pub const IMPORT_HISTORY_LIMIT: u32 = 50;

/// Where an import batch is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportBatchStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ImportBatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportBatchStatus::Pending => "pending",
            ImportBatchStatus::Processing => "processing",
            ImportBatchStatus::Completed => "completed",
            ImportBatchStatus::Failed => "failed",
        }
    }
}

impl ToSql for ImportBatchStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for ImportBatchStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "pending" => Ok(ImportBatchStatus::Pending),
            "processing" => Ok(ImportBatchStatus::Processing),
            "completed" => Ok(ImportBatchStatus::Completed),
            "failed" => Ok(ImportBatchStatus::Failed),
            other => Err(FromSqlError::Other(
                format!("invalid import batch status {other}").into(),
            )),
        }
    }
}

/// A CSV file that was imported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportBatch {
    pub id: ImportBatchId,
    pub filename: String,
    pub row_count: i64,
    pub status: ImportBatchStatus,
    pub error_message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Initialize the import batch table.
pub fn create_import_batch_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS import_batch (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            filename TEXT NOT NULL,
            row_count INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
            error_message TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_import_batch_user_created
            ON import_batch(user_id, created_at);",
    )?;

    Ok(())
}

/// Record the start of an import and return the batch ID.
pub fn create_import_batch(
    user_id: UserID,
    filename: &str,
    row_count: usize,
    status: ImportBatchStatus,
    connection: &Connection,
) -> Result<ImportBatchId, Error> {
    connection.execute(
        "INSERT INTO import_batch (user_id, filename, row_count, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            user_id.as_i64(),
            filename,
            row_count as i64,
            status,
            OffsetDateTime::now_utc(),
        ),
    )?;

    Ok(connection.last_insert_rowid())
}

/// Set the final status and row count of a batch.
pub fn finish_import_batch(
    id: ImportBatchId,
    status: ImportBatchStatus,
    row_count: usize,
    error_message: Option<&str>,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE import_batch SET status = ?1, row_count = ?2, error_message = ?3 WHERE id = ?4",
        (status, row_count as i64, error_message, id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get a user's most recent import batches, newest first.
pub fn get_import_history(
    user_id: UserID,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<ImportBatch>, Error> {
    connection
        .prepare(
            "SELECT id, filename, row_count, status, error_message, created_at
             FROM import_batch
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )?
        .query_map((user_id.as_i64(), limit), map_row)?
        .map(|maybe_batch| maybe_batch.map_err(|error| error.into()))
        .collect()
}

fn map_row(row: &Row) -> Result<ImportBatch, rusqlite::Error> {
    Ok(ImportBatch {
        id: row.get(0)?,
        filename: row.get(1)?,
        row_count: row.get(2)?,
        status: row.get(3)?,
        error_message: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod import_batch_tests {
    use rusqlite::Connection;

    use crate::{
        auth::{PasswordHash, User, create_user},
        csv_import::batch::{
            ImportBatchStatus, create_import_batch, finish_import_batch, get_import_history,
        },
        db::initialize,
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
    fn batch_lifecycle() {
        let (connection, user) = get_test_db();

        let id = create_import_batch(
            user.id,
            "march.csv",
            10,
            ImportBatchStatus::Processing,
            &connection,
        )
        .unwrap();
        finish_import_batch(id, ImportBatchStatus::Completed, 8, None, &connection).unwrap();

        let history = get_import_history(user.id, 50, &connection).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, id);
        assert_eq!(history[0].filename, "march.csv");
        assert_eq!(history[0].row_count, 8);
        assert_eq!(history[0].status, ImportBatchStatus::Completed);
        assert_eq!(history[0].error_message, None);
    }

    #[test]
    fn history_is_newest_first_and_limited() {
        let (connection, user) = get_test_db();
        for name in ["a.csv", "b.csv", "c.csv"] {
            create_import_batch(user.id, name, 1, ImportBatchStatus::Completed, &connection)
                .unwrap();
        }

        let history = get_import_history(user.id, 2, &connection).unwrap();

        let names: Vec<&str> = history.iter().map(|batch| batch.filename.as_str()).collect();
        assert_eq!(names, vec!["c.csv", "b.csv"]);
    }
}
