//! Defines the core data models and database queries for transactions.

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::{ImportBatchId, TransactionId},
    timezone::to_utc,
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money left (debit) or entered (credit) the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Debit,
    Credit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Debit => "debit",
            TransactionKind::Credit => "credit",
        }
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "debit" => Ok(TransactionKind::Debit),
            "credit" => Ok(TransactionKind::Credit),
            other => Err(FromSqlError::Other(
                format!("invalid transaction kind {other}").into(),
            )),
        }
    }
}

/// A money movement on one of the user's accounts.
///
/// Amounts are integers in the minor unit of `currency`. To create a new
/// `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub kind: TransactionKind,
    /// Where the transaction happened, e.g. a bank or e-wallet name.
    pub channel: String,
    pub status: String,
    pub merchant: Option<String>,
    /// The source system's identifier, used to detect duplicate imports.
    pub reference_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub occurred_at: OffsetDateTime,
    pub currency: String,
    pub amount: i64,
    pub fee: i64,
    /// Usually `amount + fee`, but may be set explicitly.
    pub total: i64,
    pub summary: Option<String>,
    pub notes: Option<String>,
    pub category_code: String,
    pub category_name: Option<String>,
    /// The input the transaction was created from, kept for auditing.
    pub raw_payload: Value,
    pub import_batch_id: Option<ImportBatchId>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// Start building a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(kind: TransactionKind, amount: i64, occurred_at: OffsetDateTime) -> TransactionBuilder {
        TransactionBuilder {
            kind,
            amount,
            occurred_at,
            channel: DEFAULT_CHANNEL.to_owned(),
            status: DEFAULT_STATUS.to_owned(),
            merchant: None,
            reference_id: None,
            currency: DEFAULT_CURRENCY.to_owned(),
            fee: 0,
            total: None,
            summary: None,
            notes: None,
            category_code: DEFAULT_CATEGORY.to_owned(),
            raw_payload: Value::Object(Default::default()),
            import_batch_id: None,
        }
    }
}

/// The channel of manually entered transactions.
pub const DEFAULT_CHANNEL: &str = "manual";
/// The status of transactions that do not specify one.
pub const DEFAULT_STATUS: &str = "completed";
/// The currency of transactions that do not specify one.
pub const DEFAULT_CURRENCY: &str = "IDR";
/// The category that is always present, used when no category is given.
pub const DEFAULT_CATEGORY: &str = "other";
/// The largest amount, fee or total a transaction may have, in minor units.
///
/// Keeps sums over many transactions well inside `i64`.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

/// Check that each of `amounts` is between zero and [MAX_AMOUNT].
fn validate_amounts(amounts: &[i64]) -> Result<(), Error> {
    if amounts.iter().any(|amount| *amount < 0) {
        return Err(Error::NegativeAmount);
    }
    if amounts.iter().any(|amount| *amount > MAX_AMOUNT) {
        return Err(Error::AmountTooLarge);
    }

    Ok(())
}

/// A builder for new transactions, with defaults for the optional fields.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    pub kind: TransactionKind,
    pub amount: i64,
    pub occurred_at: OffsetDateTime,
    pub channel: String,
    pub status: String,
    pub merchant: Option<String>,
    pub reference_id: Option<String>,
    pub currency: String,
    pub fee: i64,
    /// Defaults to `amount + fee` when `None`.
    pub total: Option<i64>,
    pub summary: Option<String>,
    pub notes: Option<String>,
    pub category_code: String,
    pub raw_payload: Value,
    pub import_batch_id: Option<ImportBatchId>,
}

impl TransactionBuilder {
    pub fn channel(mut self, channel: &str) -> Self {
        self.channel = channel.to_owned();
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = status.to_owned();
        self
    }

    pub fn merchant(mut self, merchant: Option<String>) -> Self {
        self.merchant = merchant;
        self
    }

    /// Set the reference ID. Empty strings are treated as no reference ID.
    pub fn reference_id(mut self, reference_id: Option<String>) -> Self {
        self.reference_id = reference_id.filter(|reference_id| !reference_id.is_empty());
        self
    }

    pub fn currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_owned();
        self
    }

    pub fn fee(mut self, fee: i64) -> Self {
        self.fee = fee;
        self
    }

    pub fn total(mut self, total: Option<i64>) -> Self {
        self.total = total;
        self
    }

    pub fn summary(mut self, summary: Option<String>) -> Self {
        self.summary = summary;
        self
    }

    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn category_code(mut self, category_code: &str) -> Self {
        self.category_code = category_code.to_owned();
        self
    }

    pub fn raw_payload(mut self, raw_payload: Value) -> Self {
        self.raw_payload = raw_payload;
        self
    }

    pub fn import_batch_id(mut self, import_batch_id: Option<ImportBatchId>) -> Self {
        self.import_batch_id = import_batch_id;
        self
    }

    fn resolved_total(&self) -> i64 {
        self.total
            .unwrap_or_else(|| self.amount.saturating_add(self.fee))
    }
}

/// The fields of a transaction that can be changed after creation.
///
/// `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransactionUpdate {
    pub kind: Option<TransactionKind>,
    pub channel: Option<String>,
    pub status: Option<String>,
    pub merchant: Option<String>,
    pub reference_id: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub occurred_at: Option<OffsetDateTime>,
    pub currency: Option<String>,
    pub amount: Option<i64>,
    pub fee: Option<i64>,
    pub total: Option<i64>,
    pub summary: Option<String>,
    pub notes: Option<String>,
    pub category_code: Option<String>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Selects the columns read by [map_transaction_row], joined with the category name.
pub(super) const SELECT_TRANSACTION: &str = "SELECT t.id, t.kind, t.channel, t.status, t.merchant, \
    t.reference_id, t.occurred_at, t.currency, t.amount, t.fee, t.total, t.summary, t.notes, \
    t.category_code, c.name, t.raw_payload, t.import_batch_id, t.created_at \
    FROM \"transaction\" t LEFT JOIN category c ON c.code = t.category_code";

/// Insert a new transaction and return its ID.
///
/// # Errors
/// This function will return a:
/// - [Error::NegativeAmount] if the amount, fee or total is negative,
/// - [Error::AmountTooLarge] if the amount, fee or total is larger than [MAX_AMOUNT],
/// - [Error::DateOutOfRange] if `occurred_at` cannot be converted to UTC,
/// - [Error::InvalidCategory] if the category code does not refer to a category,
/// - [Error::DuplicateReferenceId] if a transaction with the same reference ID already exists,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn insert_transaction(
    builder: &TransactionBuilder,
    connection: &Connection,
) -> Result<TransactionId, Error> {
    let total = builder.resolved_total();
    validate_amounts(&[builder.amount, builder.fee, total])?;
    let occurred_at = to_utc(builder.occurred_at)?;

    connection
        .execute(
            "INSERT INTO \"transaction\" (kind, channel, status, merchant, reference_id, \
                occurred_at, currency, amount, fee, total, summary, notes, category_code, \
                raw_payload, import_batch_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            rusqlite::params![
                builder.kind,
                builder.channel,
                builder.status,
                builder.merchant,
                builder.reference_id,
                occurred_at,
                builder.currency,
                builder.amount,
                builder.fee,
                total,
                builder.summary,
                builder.notes,
                builder.category_code,
                builder.raw_payload,
                builder.import_batch_id,
                OffsetDateTime::now_utc(),
            ],
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(builder.category_code.clone()),
            error => error.into(),
        })?;

    Ok(connection.last_insert_rowid())
}

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// See [insert_transaction].
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let id = insert_transaction(&builder, connection)?;

    get_transaction(id, connection)
}

/// Retrieve a transaction in the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    connection
        .prepare(&format!("{SELECT_TRANSACTION} WHERE t.id = :id"))?
        .query_row(&[(":id", &id)], map_transaction_row)
        .map_err(Error::from)
}

/// Apply `update` to the transaction with `id` and return the updated transaction.
///
/// When the amount or fee changes and no total is given, the total is
/// recalculated as `amount + fee`.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingTransaction] if `id` does not refer to a valid transaction,
/// - [Error::NegativeAmount] if a resulting amount is negative,
/// - [Error::AmountTooLarge] if a resulting amount is larger than [MAX_AMOUNT],
/// - [Error::DateOutOfRange] if the new `occurred_at` cannot be converted to UTC,
/// - [Error::InvalidCategory] if the new category does not exist,
/// - [Error::DuplicateReferenceId] if the new reference ID is already used.
pub fn update_transaction(
    id: TransactionId,
    update: TransactionUpdate,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let existing = match get_transaction(id, connection) {
        Ok(transaction) => transaction,
        Err(Error::NotFound) => return Err(Error::UpdateMissingTransaction),
        Err(error) => return Err(error),
    };

    let amount = update.amount.unwrap_or(existing.amount);
    let fee = update.fee.unwrap_or(existing.fee);
    let total = match (update.total, update.amount, update.fee) {
        (Some(total), _, _) => total,
        (None, None, None) => existing.total,
        (None, _, _) => amount.saturating_add(fee),
    };
    validate_amounts(&[amount, fee, total])?;
    let occurred_at = to_utc(update.occurred_at.unwrap_or(existing.occurred_at))?;

    let category_code = update.category_code.unwrap_or(existing.category_code);
    let reference_id = match update.reference_id {
        Some(reference_id) if reference_id.is_empty() => None,
        Some(reference_id) => Some(reference_id),
        None => existing.reference_id,
    };

    connection
        .execute(
            "UPDATE \"transaction\" SET kind = ?1, channel = ?2, status = ?3, merchant = ?4, \
                reference_id = ?5, occurred_at = ?6, currency = ?7, amount = ?8, fee = ?9, \
                total = ?10, summary = ?11, notes = ?12, category_code = ?13
             WHERE id = ?14",
            rusqlite::params![
                update.kind.unwrap_or(existing.kind),
                update.channel.unwrap_or(existing.channel),
                update.status.unwrap_or(existing.status),
                update.merchant.or(existing.merchant),
                reference_id,
                occurred_at,
                update.currency.unwrap_or(existing.currency),
                amount,
                fee,
                total,
                update.summary.or(existing.summary),
                update.notes.or(existing.notes),
                category_code,
                id,
            ],
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(category_code.clone()),
            error => error.into(),
        })?;

    get_transaction(id, connection)
}

/// Delete the transaction with `id`.
///
/// # Errors
/// Returns [Error::DeleteMissingTransaction] if there is no such transaction.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

/// Get the total number of transactions in the database.
pub fn count_transactions(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|count| count as usize)
        .map_err(|error| error.into())
}

/// Get the `limit` most recent transactions, newest first.
pub fn get_recent_transactions(
    limit: u64,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION} ORDER BY t.occurred_at DESC, t.id DESC LIMIT ?1"
        ))?
        .query_map([limit as i64], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY,
                kind TEXT NOT NULL CHECK (kind IN ('debit', 'credit')),
                channel TEXT NOT NULL,
                status TEXT NOT NULL,
                merchant TEXT,
                reference_id TEXT UNIQUE,
                occurred_at TEXT NOT NULL,
                currency TEXT NOT NULL DEFAULT 'IDR',
                amount INTEGER NOT NULL CHECK (amount >= 0),
                fee INTEGER NOT NULL DEFAULT 0 CHECK (fee >= 0),
                total INTEGER NOT NULL CHECK (total >= 0),
                summary TEXT,
                notes TEXT,
                category_code TEXT NOT NULL REFERENCES category(code) ON UPDATE CASCADE,
                raw_payload TEXT NOT NULL DEFAULT '{}',
                import_batch_id INTEGER REFERENCES import_batch(id) ON DELETE SET NULL,
                created_at TEXT NOT NULL
                );

        CREATE INDEX IF NOT EXISTS idx_transaction_occurred_at ON \"transaction\"(occurred_at);
        CREATE INDEX IF NOT EXISTS idx_transaction_category ON \"transaction\"(category_code);",
    )?;

    Ok(())
}

/// Map a row selected with the transaction columns to a [Transaction].
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        kind: row.get(1)?,
        channel: row.get(2)?,
        status: row.get(3)?,
        merchant: row.get(4)?,
        reference_id: row.get(5)?,
        occurred_at: row.get(6)?,
        currency: row.get(7)?,
        amount: row.get(8)?,
        fee: row.get(9)?,
        total: row.get(10)?,
        summary: row.get(11)?,
        notes: row.get(12)?,
        category_code: row.get(13)?,
        category_name: row.get(14)?,
        raw_payload: row.get(15)?,
        import_batch_id: row.get(16)?,
        created_at: row.get(17)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
