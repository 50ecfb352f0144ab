//! Budget models.

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{budget::period::BudgetPeriod, database_id::BudgetId};

/// How often a budget's amount is meant to be spent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    #[default]
    Monthly,
    Weekly,
    Yearly,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Monthly => "monthly",
            PeriodType::Weekly => "weekly",
            PeriodType::Yearly => "yearly",
        }
    }
}

impl ToSql for PeriodType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for PeriodType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "monthly" => Ok(PeriodType::Monthly),
            "weekly" => Ok(PeriodType::Weekly),
            "yearly" => Ok(PeriodType::Yearly),
            other => Err(FromSqlError::Other(
                format!("invalid period type {other}").into(),
            )),
        }
    }
}

/// A spending limit for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Budget {
    pub id: BudgetId,
    pub category_code: String,
    pub amount: i64,
    pub period_type: PeriodType,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A budget with its category's name and everything spent in that category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetWithSpending {
    #[serde(flatten)]
    pub budget: Budget,
    pub category_name: String,
    pub actual_spent: i64,
}

/// The totals over all of a user's active budgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub total_budget: i64,
    /// Spent in categories that have an active budget.
    pub total_spent: i64,
    /// Spent in all categories.
    pub total_all_spent: i64,
    pub remaining: i64,
}

/// The budget cycle a response was computed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodInfo {
    pub start_day: u8,
    #[serde(with = "time::serde::rfc3339")]
    pub period_start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub period_end: OffsetDateTime,
}

impl PeriodInfo {
    pub fn new(start_day: u8, period: BudgetPeriod) -> Self {
        Self {
            start_day,
            period_start: period.start,
            period_end: period.end,
        }
    }
}

/// The data needed to create or replace a category's budget.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewBudget {
    pub category_code: Option<String>,
    pub amount: Option<i64>,
    #[serde(default)]
    pub period_type: PeriodType,
}

/// A partial update of a budget. Missing fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BudgetUpdate {
    pub amount: Option<i64>,
    pub period_type: Option<PeriodType>,
    pub is_active: Option<bool>,
}
