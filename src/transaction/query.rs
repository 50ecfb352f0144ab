//! Filtered, sorted and paged transaction lists and summary totals.

use rusqlite::{Connection, ToSql, params_from_iter};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    pagination::{Pagination, PaginationConfig},
    timezone::to_utc,
    transaction::{
        Transaction, TransactionKind,
        core::{SELECT_TRANSACTION, map_transaction_row},
    },
};

/// An optional, inclusive window of time.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DateRange {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
}

impl DateRange {
    /// The bounds converted to UTC, matching how timestamps are stored.
    ///
    /// # Errors
    /// Returns [Error::DateOutOfRange] if a bound cannot be converted to UTC.
    pub fn utc_bounds(&self) -> Result<(Option<OffsetDateTime>, Option<OffsetDateTime>), Error> {
        Ok((
            self.start_date.map(to_utc).transpose()?,
            self.end_date.map(to_utc).transpose()?,
        ))
    }
}

/// The query parameters accepted by the transaction list.
///
/// Empty strings are ignored so that blank form fields do not filter anything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionQuery {
    pub category: Option<String>,
    pub channel: Option<String>,
    pub status: Option<String>,
    /// Case-insensitive substring of the merchant.
    pub merchant: Option<String>,
    pub kind: Option<TransactionKind>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    /// Case-insensitive substring of the merchant, summary or reference ID.
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// One page of transactions.
#[derive(Debug, Serialize)]
pub struct TransactionPage {
    pub data: Vec<Transaction>,
    pub pagination: Pagination,
}

/// Income and expense totals over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionStats {
    pub total_income: i64,
    pub total_expense: i64,
    pub total_transactions: i64,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

/// Map a requested sort field to a column, falling back to the transaction time.
fn sort_column(sort_by: Option<&str>) -> &'static str {
    match sort_by {
        Some("amount") => "t.amount",
        Some("total") => "t.total",
        Some("merchant") => "t.merchant",
        Some("category_code") => "t.category_code",
        Some("created_at") => "t.created_at",
        _ => "t.occurred_at",
    }
}

fn sort_direction(sort_order: Option<&str>) -> &'static str {
    match sort_order {
        Some(order) if order.eq_ignore_ascii_case("asc") => "ASC",
        _ => "DESC",
    }
}

/// Build the WHERE clause and its positional parameters for `query`.
fn build_filter(query: &TransactionQuery) -> Result<(String, Vec<Box<dyn ToSql>>), Error> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(category) = non_empty(&query.category) {
        clauses.push("t.category_code = ?");
        params.push(Box::new(category.to_owned()));
    }

    if let Some(channel) = non_empty(&query.channel) {
        clauses.push("t.channel = ?");
        params.push(Box::new(channel.to_owned()));
    }

    if let Some(status) = non_empty(&query.status) {
        clauses.push("t.status = ?");
        params.push(Box::new(status.to_owned()));
    }

    if let Some(merchant) = non_empty(&query.merchant) {
        clauses.push("t.merchant LIKE ?");
        params.push(Box::new(format!("%{merchant}%")));
    }

    if let Some(kind) = query.kind {
        clauses.push("t.kind = ?");
        params.push(Box::new(kind));
    }

    if let Some(start_date) = query.start_date {
        clauses.push("t.occurred_at >= ?");
        params.push(Box::new(to_utc(start_date)?));
    }

    if let Some(end_date) = query.end_date {
        clauses.push("t.occurred_at <= ?");
        params.push(Box::new(to_utc(end_date)?));
    }

    if let Some(search) = non_empty(&query.search) {
        clauses.push("(t.merchant LIKE ? OR t.summary LIKE ? OR t.reference_id LIKE ?)");
        let pattern = format!("%{search}%");
        params.push(Box::new(pattern.clone()));
        params.push(Box::new(pattern.clone()));
        params.push(Box::new(pattern));
    }

    if clauses.is_empty() {
        Ok((String::new(), params))
    } else {
        Ok((format!(" WHERE {}", clauses.join(" AND ")), params))
    }
}

/// Get the page of transactions matching `query`.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn list_transactions(
    query: &TransactionQuery,
    pagination_config: &PaginationConfig,
    connection: &Connection,
) -> Result<TransactionPage, Error> {
    let (page, limit) = pagination_config.resolve(query.page, query.limit);
    let (where_clause, mut params) = build_filter(query)?;

    let total: i64 = connection.query_row(
        &format!("SELECT COUNT(t.id) FROM \"transaction\" t{where_clause}"),
        params_from_iter(params.iter()),
        |row| row.get(0),
    )?;

    let pagination = Pagination::new(page, limit, total as u64);
    params.push(Box::new(limit as i64));
    params.push(Box::new(pagination.offset()));

    let sql = format!(
        "{SELECT_TRANSACTION}{where_clause} ORDER BY {} {}, t.id DESC LIMIT ? OFFSET ?",
        sort_column(query.sort_by.as_deref()),
        sort_direction(query.sort_order.as_deref()),
    );

    let data = connection
        .prepare(&sql)?
        .query_map(params_from_iter(params.iter()), map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TransactionPage { data, pagination })
}

/// Sum credits as income and debits as expenses within `range`.
pub fn summarize_transactions(
    range: &DateRange,
    connection: &Connection,
) -> Result<TransactionStats, Error> {
    let (start_date, end_date) = range.utc_bounds()?;

    connection
        .query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN kind = 'credit' THEN total ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN kind = 'debit' THEN total ELSE 0 END), 0),
                COUNT(id)
             FROM \"transaction\"
             WHERE (?1 IS NULL OR occurred_at >= ?1) AND (?2 IS NULL OR occurred_at <= ?2)",
            (start_date, end_date),
            |row| {
                Ok(TransactionStats {
                    total_income: row.get(0)?,
                    total_expense: row.get(1)?,
                    total_transactions: row.get(2)?,
                })
            },
        )
        .map_err(Error::from)
}
