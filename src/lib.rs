//! Ledger is a personal-finance web app for tracking transactions, budgets and
//! spending habits.
//!
//! This library provides a JSON REST API backed by SQLite. A single-page
//! dashboard consumes the API; it is not part of this crate.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod analytics;
mod app_state;
mod auth;
mod budget;
mod category;
mod csv_import;
mod database_id;
mod db;
mod endpoints;
mod logging;
mod not_found;
mod pagination;
mod routing;
mod settings;
mod timezone;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{
    PasswordHash, User, UserID, ValidatedPassword, get_user_by_username, update_password,
};
pub use csv_import::DecimalSeparator;
pub use db::{ensure_default_user, initialize as initialize_db};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use pagination::PaginationConfig;
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The username and password combination did not match a registered user.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The auth cookie is missing, could not be decrypted or has expired.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A request body was missing one or more required fields.
    ///
    /// The string lists the missing fields, e.g. "kind, channel".
    #[error("Missing required fields: {0}")]
    MissingFields(String),

    /// A request body or query could not be interpreted.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A money amount (amount, fee or total) was negative.
    #[error("amounts must not be negative")]
    NegativeAmount,

    /// A money amount (amount, fee or total) is larger than the largest supported amount.
    #[error("amounts must not be larger than {}", crate::transaction::MAX_AMOUNT)]
    AmountTooLarge,

    /// A date is too close to the limits of the calendar to be stored in UTC.
    #[error("the date {0} is out of range")]
    DateOutOfRange(String),

    /// A transaction with the same reference ID already exists.
    ///
    /// Reference IDs identify a transaction from its source (e.g. a bank
    /// statement), so rejecting duplicates stops the same transaction from
    /// being recorded twice when overlapping files are imported.
    #[error("Transaction with this reference_id already exists")]
    DuplicateReferenceId,

    /// The category code does not refer to an existing category.
    #[error("the category \"{0}\" does not exist")]
    InvalidCategory(String),

    /// A category with the same code already exists.
    #[error("Category with code \"{0}\" already exists")]
    DuplicateCategoryCode(String),

    /// The category cannot be deleted while transactions still refer to it.
    #[error("Cannot delete category \"{0}\" that is in use by transactions")]
    CategoryInUse(String),

    /// The budget cycle start day was not an integer between 1 and 28.
    #[error("budget cycle start day must be a whole number from 1 to 28, got {0}")]
    InvalidCycleStartDay(String),

    /// A settings update did not include a value.
    #[error("Value is required")]
    MissingSettingValue,

    /// The multipart upload did not contain a file.
    #[error("No file uploaded")]
    NoFileProvided,

    /// The multipart form could not be parsed.
    #[error("Could not parse multipart form: {0}")]
    MultipartError(String),

    /// The uploaded file is larger than the upload limit.
    #[error("The uploaded file must not be larger than {} bytes", crate::csv_import::MAX_UPLOAD_SIZE)]
    FileTooLarge,

    /// The uploaded file could not be read as CSV at all (e.g. bad header row).
    #[error("Could not parse the CSV file: {0}")]
    InvalidCSV(String),

    /// None of the rows in an uploaded CSV file could be normalised.
    #[error("No valid rows found in CSV")]
    NoValidRows,

    /// The import could not be written to the database and was rolled back.
    ///
    /// Individual row failures do not cause this error, only failures of the
    /// import as a whole.
    #[error("Failed to import CSV file: {0}")]
    ImportFailed(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to update a transaction that does not exist.
    #[error("Transaction not found")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist.
    #[error("Transaction not found")]
    DeleteMissingTransaction,

    /// Tried to update a category that does not exist.
    #[error("Category not found")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist.
    #[error("Category not found")]
    DeleteMissingCategory,

    /// Tried to update a budget that does not exist.
    #[error("Budget not found")]
    UpdateMissingBudget,

    /// Tried to delete a budget that does not exist.
    #[error("Budget not found")]
    DeleteMissingBudget,

    /// Tried to read or delete a setting that does not exist.
    #[error("Setting not found")]
    MissingSetting,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing a struct as JSON.
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && desc.ends_with("transaction.reference_id") =>
            {
                Error::DuplicateReferenceId
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidCredentials | Error::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Error::TooWeak(_)
            | Error::MissingFields(_)
            | Error::InvalidRequest(_)
            | Error::NegativeAmount
            | Error::AmountTooLarge
            | Error::DateOutOfRange(_)
            | Error::InvalidCategory(_)
            | Error::CategoryInUse(_)
            | Error::InvalidCycleStartDay(_)
            | Error::MissingSettingValue
            | Error::NoFileProvided
            | Error::MultipartError(_)
            | Error::InvalidCSV(_)
            | Error::NoValidRows => StatusCode::BAD_REQUEST,
            Error::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Error::DuplicateReferenceId | Error::DuplicateCategoryCode(_) => StatusCode::CONFLICT,
            Error::NotFound
            | Error::UpdateMissingTransaction
            | Error::DeleteMissingTransaction
            | Error::UpdateMissingCategory
            | Error::DeleteMissingCategory
            | Error::UpdateMissingBudget
            | Error::DeleteMissingBudget
            | Error::MissingSetting => StatusCode::NOT_FOUND,
            Error::HashingError(_)
            | Error::ImportFailed(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::InvalidTimezoneError(_)
            | Error::JSONSerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match self {
            Error::ImportFailed(_) => {
                tracing::error!("{self}");
                "Failed to import CSV file".to_owned()
            }
            // Server side errors are not intended to be shown to the client.
            error if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("An unexpected error occurred: {}", error);
                "Internal server error".to_owned()
            }
            error => error.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
