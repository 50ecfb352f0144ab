//! Budgets: spending limits per category, measured over budget cycles that start
//! on a configurable day of the month.

mod db;
mod domain;
mod endpoints;
mod period;

pub use db::{
    create_budget_table, delete_budget, get_active_budgets, get_budget_summary, update_budget,
    upsert_budget,
};
pub use domain::{
    Budget, BudgetSummary, BudgetUpdate, BudgetWithSpending, NewBudget, PeriodInfo, PeriodType,
};
pub use endpoints::{
    create_budget_endpoint, delete_budget_endpoint, edit_budget_endpoint,
    get_budget_summary_endpoint, get_budgets_endpoint,
};
pub use period::{
    BUDGET_CYCLE_SETTING_KEY, BudgetCycleStartDay, budget_period, get_budget_cycle_start_day,
};
