//! Defines the endpoint for creating a new transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    db::lock_connection,
    transaction::{Transaction, TransactionKind, core::create_transaction},
};

/// The state needed to create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The JSON body for creating a transaction.
///
/// `kind`, `channel`, `status` and `occurred_at` are required, everything else is optional.
#[derive(Debug, Default, Deserialize)]
pub struct NewTransactionData {
    pub kind: Option<TransactionKind>,
    pub channel: Option<String>,
    pub status: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub occurred_at: Option<OffsetDateTime>,
    pub merchant: Option<String>,
    pub reference_id: Option<String>,
    pub currency: Option<String>,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub fee: i64,
    pub total: Option<i64>,
    pub summary: Option<String>,
    pub notes: Option<String>,
    pub category_code: Option<String>,
}

impl NewTransactionData {
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        if self.kind.is_none() {
            missing.push("kind");
        }
        if self.channel.as_deref().is_none_or(str::is_empty) {
            missing.push("channel");
        }
        if self.status.as_deref().is_none_or(str::is_empty) {
            missing.push("status");
        }
        if self.occurred_at.is_none() {
            missing.push("occurred_at");
        }

        missing
    }
}

/// A route handler for creating a new transaction.
///
/// Responds with 201 and the created transaction.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Json(data): Json<Value>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let raw_payload = data.clone();
    let data: NewTransactionData = serde_json::from_value(data)
        .map_err(|error| Error::InvalidRequest(error.to_string()))?;

    let missing = data.missing_fields();
    let (Some(kind), Some(channel), Some(status), Some(occurred_at), true) = (
        data.kind,
        data.channel,
        data.status,
        data.occurred_at,
        missing.is_empty(),
    ) else {
        return Err(Error::MissingFields(missing.join(", ")));
    };

    let mut builder = Transaction::build(kind, data.amount, occurred_at)
        .channel(&channel)
        .status(&status)
        .merchant(data.merchant)
        .reference_id(data.reference_id)
        .fee(data.fee)
        .total(data.total)
        .summary(data.summary)
        .notes(data.notes)
        .raw_payload(raw_payload);

    if let Some(currency) = data.currency.as_deref().filter(|currency| !currency.is_empty()) {
        builder = builder.currency(currency);
    }
    if let Some(category_code) = data.category_code.as_deref().filter(|code| !code.is_empty()) {
        builder = builder.category_code(category_code);
    }

    let connection = lock_connection(&state.db_connection)?;
    let transaction = create_transaction(builder, &connection)?;

    Ok((StatusCode::CREATED, Json(transaction)))
}
