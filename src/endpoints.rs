//! The REST API endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/budgets/{budget_id}', use [format_endpoint]
//! to fill in the parameter.

/// Liveness check that does not touch the database.
pub const HEALTH: &str = "/health";

/// The route for logging in a user.
pub const LOG_IN: &str = "/api/auth/login";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/auth/logout";
/// The route to get the currently logged in user.
pub const ME: &str = "/api/auth/me";
/// The route to change the current user's password.
pub const CHANGE_PASSWORD: &str = "/api/auth/change-password";

/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route for the income/expense totals of transactions.
pub const TRANSACTION_STATS: &str = "/api/transactions/stats/summary";

/// The route to list and create categories.
pub const CATEGORIES: &str = "/api/categories";
/// The route to list categories with their transaction totals.
pub const CATEGORIES_WITH_STATS: &str = "/api/categories/with-stats";
/// The route to access a single category by its code.
pub const CATEGORY: &str = "/api/categories/{category_code}";

/// The route to list and upsert budgets.
pub const BUDGETS: &str = "/api/budgets";
/// The route for the budget totals of the current user.
pub const BUDGETS_SUMMARY: &str = "/api/budgets/summary";
/// The route to access a single budget.
pub const BUDGET: &str = "/api/budgets/{budget_id}";

/// The route to list all settings of the current user.
pub const SETTINGS: &str = "/api/settings";
/// The route to access a single setting by key.
pub const SETTING: &str = "/api/settings/{key}";

/// The route to preview a CSV file without saving it.
pub const IMPORT_PREVIEW: &str = "/api/import/preview";
/// The route to import a CSV file.
pub const IMPORT_COMMIT: &str = "/api/import/commit";
/// The route to list past imports.
pub const IMPORT_HISTORY: &str = "/api/import/history";

/// The route for the dashboard overview figures.
pub const ANALYTICS_OVERVIEW: &str = "/api/analytics/overview";
/// The route for month-by-month income and expenses.
pub const ANALYTICS_MONTHLY: &str = "/api/analytics/monthly";

/// Replace the first parameter in `endpoint_path` with `value`.
///
/// A parameter is a name wrapped in braces, for example '{budget_id}' in
/// '/api/budgets/{budget_id}'.
///
/// If no parameter is found in `endpoint_path`, the function returns
/// the original `endpoint_path`.
#[cfg(test)]
pub fn format_endpoint(endpoint_path: &str, value: impl std::fmt::Display) -> String {
    let Some((head, rest)) = endpoint_path.split_once('{') else {
        return endpoint_path.to_owned();
    };

    let tail = rest.split_once('}').map(|(_, tail)| tail).unwrap_or("");

    format!("{head}{value}{tail}")
}
