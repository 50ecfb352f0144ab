//! Endpoints for reading transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    database_id::TransactionId,
    db::lock_connection,
    pagination::PaginationConfig,
    transaction::{
        Transaction,
        core::get_transaction,
        query::{
            DateRange, TransactionPage, TransactionQuery, TransactionStats, list_transactions,
            summarize_transactions,
        },
    },
};

/// The state needed to read transactions.
#[derive(Debug, Clone)]
pub struct TransactionsState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for TransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// List transactions matching the query's filters, one page at a time.
pub async fn get_transactions_endpoint(
    State(state): State<TransactionsState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<TransactionPage>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_transactions(&query, &state.pagination_config, &connection).map(Json)
}

/// Get a single transaction.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionsState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<Transaction>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_transaction(transaction_id, &connection).map(Json)
}

/// Get income and expense totals, optionally within a date range.
pub async fn get_transaction_stats_endpoint(
    State(state): State<TransactionsState>,
    Query(range): Query<DateRange>,
) -> Result<Json<TransactionStats>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    summarize_transactions(&range, &connection).map(Json)
}
