//! The REST endpoints for budgets.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    auth::UserID,
    budget::{
        Budget, BudgetSummary, BudgetUpdate, BudgetWithSpending, NewBudget, PeriodInfo,
        budget_period, delete_budget, get_active_budgets, get_budget_cycle_start_day,
        get_budget_summary, update_budget, upsert_budget,
    },
    database_id::BudgetId,
    db::lock_connection,
    timezone::local_now,
};

/// The state needed for the budget endpoints.
#[derive(Debug, Clone)]
pub struct BudgetState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The canonical timezone used to find the current budget cycle.
    pub local_timezone: String,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A response body with the budget cycle it was computed for.
#[derive(Debug, Serialize)]
pub struct WithPeriod<T> {
    pub data: T,
    pub period: PeriodInfo,
}

fn current_period(
    state: &BudgetState,
    user_id: UserID,
    connection: &Connection,
) -> Result<PeriodInfo, Error> {
    let start_day = get_budget_cycle_start_day(user_id, connection)?;
    let now = local_now(&state.local_timezone)?;

    Ok(PeriodInfo::new(start_day.day(), budget_period(start_day, now)))
}

/// List the active budgets of the current user with their spending.
pub async fn get_budgets_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<WithPeriod<Vec<BudgetWithSpending>>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let data = get_active_budgets(user_id, &connection)?;
    let period = current_period(&state, user_id, &connection)?;

    Ok(Json(WithPeriod { data, period }))
}

/// Get the total budget and spending of the current user.
pub async fn get_budget_summary_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<WithPeriod<BudgetSummary>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let data = get_budget_summary(user_id, &connection)?;
    let period = current_period(&state, user_id, &connection)?;

    Ok(Json(WithPeriod { data, period }))
}

/// Create or replace the budget for a category.
pub async fn create_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    Json(new_budget): Json<NewBudget>,
) -> Result<(StatusCode, Json<Budget>), Error> {
    let (category_code, amount) = match (new_budget.category_code, new_budget.amount) {
        (Some(code), Some(amount)) if !code.trim().is_empty() => (code, amount),
        (code, amount) => {
            let mut missing = Vec::new();
            if code.is_none_or(|code| code.trim().is_empty()) {
                missing.push("category_code");
            }
            if amount.is_none() {
                missing.push("amount");
            }
            return Err(Error::MissingFields(missing.join(", ")));
        }
    };

    let connection = lock_connection(&state.db_connection)?;
    let budget = upsert_budget(
        user_id,
        category_code.trim(),
        amount,
        new_budget.period_type,
        &connection,
    )?;

    Ok((StatusCode::CREATED, Json(budget)))
}

/// Partially update a budget.
pub async fn edit_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    Path(budget_id): Path<BudgetId>,
    Json(update): Json<BudgetUpdate>,
) -> Result<Json<Budget>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    update_budget(user_id, budget_id, update, &connection).map(Json)
}

/// Delete a budget.
pub async fn delete_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    Path(budget_id): Path<BudgetId>,
) -> Result<Json<Value>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_budget(user_id, budget_id, &connection)?;

    Ok(Json(json!({ "message": "Budget deleted" })))
}
