//! Saves the rows of a CSV file as transactions in one import batch.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Multipart, State, multipart::MultipartRejection},
};
use rusqlite::Connection;
use serde::Serialize;

use crate::{
    AppState, Error,
    auth::UserID,
    csv_import::{
        DecimalSeparator,
        batch::{ImportBatchStatus, create_import_batch, finish_import_batch},
        multipart::read_uploaded_file,
        normalize::{NormalizeConfig, RowError, RowErrorKind},
        reader::{NormalizedCsv, read_csv},
    },
    database_id::ImportBatchId,
    db::lock_connection,
    timezone::local_offset_or_error,
    transaction::insert_transaction,
};

/// The number of row errors included in import responses.
pub const MAX_REPORTED_ERRORS: usize = 10;

/// The state needed to import CSV files.
#[derive(Debug, Clone)]
pub struct ImportState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The canonical timezone that dates without an offset are in.
    pub local_timezone: String,
    pub decimal_separator: DecimalSeparator,
}

impl FromRef<AppState> for ImportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            decimal_separator: state.decimal_separator,
        }
    }
}

impl ImportState {
    pub fn normalize_config(&self) -> Result<NormalizeConfig, Error> {
        let local_offset = local_offset_or_error(&self.local_timezone)?;

        Ok(NormalizeConfig::new(self.decimal_separator, local_offset))
    }
}

/// The outcome of committing a CSV file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResult {
    pub success: bool,
    pub batch_id: ImportBatchId,
    pub inserted: usize,
    /// Rows whose reference ID was already imported.
    pub skipped: usize,
    /// The number of rows that could not be parsed or inserted.
    pub errors: usize,
    pub error_details: Vec<RowError>,
}

/// Import a CSV file uploaded in the `file` field of a multipart form.
pub async fn commit_import_endpoint(
    State(state): State<ImportState>,
    Extension(user_id): Extension<UserID>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<CommitResult>, Error> {
    let file = read_uploaded_file(multipart).await?;
    let normalized = read_csv(&file.data, &state.normalize_config()?)?;

    let connection = lock_connection(&state.db_connection)?;

    commit_rows(user_id, &file.filename, normalized, &connection).map(Json)
}

/// Insert the valid rows of a normalized CSV file as one import batch.
///
/// Rows with a reference ID that already exists are skipped. Rows the database
/// rejects for other reasons are reported as row errors. Everything, including
/// the batch record, is rolled back if the batch as a whole cannot be written.
///
/// # Errors
/// Returns [Error::NoValidRows] if no row could be normalized, or
/// [Error::ImportFailed] if the batch could not be written.
pub fn commit_rows(
    user_id: UserID,
    filename: &str,
    normalized: NormalizedCsv,
    connection: &Connection,
) -> Result<CommitResult, Error> {
    if normalized.rows.is_empty() {
        return Err(Error::NoValidRows);
    }

    write_batch(user_id, filename, normalized, connection).map_err(|error| {
        tracing::error!("Import of '{filename}' rolled back: {error}");
        Error::ImportFailed(error.to_string())
    })
}

fn write_batch(
    user_id: UserID,
    filename: &str,
    normalized: NormalizedCsv,
    connection: &Connection,
) -> Result<CommitResult, Error> {
    let transaction = connection.unchecked_transaction()?;

    let batch_id = create_import_batch(
        user_id,
        filename,
        normalized.rows_read,
        ImportBatchStatus::Processing,
        &transaction,
    )?;

    let mut inserted = 0;
    let mut skipped = 0;
    let mut errors = normalized.errors;

    for row in &normalized.rows {
        match insert_transaction(&row.to_builder(batch_id), &transaction) {
            Ok(_) => inserted += 1,
            Err(Error::DuplicateReferenceId) => skipped += 1,
            Err(error) => errors.push(RowError {
                row: row.row,
                error: RowErrorKind::Rejected(error.to_string()),
            }),
        }
    }

    finish_import_batch(
        batch_id,
        ImportBatchStatus::Completed,
        inserted,
        None,
        &transaction,
    )?;

    transaction.commit()?;

    tracing::info!(
        "Imported '{filename}' as batch {batch_id}: {inserted} inserted, {skipped} skipped, {} errors",
        errors.len()
    );

    let error_count = errors.len();
    errors.sort_by_key(|error| error.row);
    errors.truncate(MAX_REPORTED_ERRORS);

    Ok(CommitResult {
        success: true,
        batch_id,
        inserted,
        skipped,
        errors: error_count,
        error_details: errors,
    })
}
