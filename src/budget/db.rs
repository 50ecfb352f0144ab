//! Database operations for budgets.

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::UserID,
    budget::{Budget, BudgetSummary, BudgetUpdate, BudgetWithSpending, PeriodType},
    database_id::BudgetId,
};

const SELECT_BUDGET: &str = "SELECT b.id, b.category_code, b.amount, b.period_type, b.is_active, \
    b.created_at, b.updated_at FROM budget b";

/// Initialize the budget table.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            category_code TEXT NOT NULL,
            amount INTEGER NOT NULL CHECK (amount >= 0),
            period_type TEXT NOT NULL DEFAULT 'monthly'
                CHECK (period_type IN ('monthly', 'weekly', 'yearly')),
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(user_id, category_code),
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE,
            FOREIGN KEY(category_code) REFERENCES category(code)
                ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_budget_user ON budget(user_id);",
    )?;

    Ok(())
}

/// Create the budget for a category, or replace the amount and period of the
/// existing one. Either way the budget ends up active.
///
/// # Errors
/// Returns [Error::InvalidCategory] if the category does not exist, or
/// [Error::NegativeAmount] if `amount` is negative.
pub fn upsert_budget(
    user_id: UserID,
    category_code: &str,
    amount: i64,
    period_type: PeriodType,
    connection: &Connection,
) -> Result<Budget, Error> {
    if amount < 0 {
        return Err(Error::NegativeAmount);
    }

    let now = OffsetDateTime::now_utc();

    connection
        .execute(
            "INSERT INTO budget (user_id, category_code, amount, period_type, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)
             ON CONFLICT(user_id, category_code) DO UPDATE SET
                amount = excluded.amount,
                period_type = excluded.period_type,
                is_active = 1,
                updated_at = excluded.updated_at",
            (user_id.as_i64(), category_code, amount, period_type, now),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(category_code.to_owned()),
            error => error.into(),
        })?;

    connection
        .query_row(
            &format!("{SELECT_BUDGET} WHERE b.user_id = ?1 AND b.category_code = ?2"),
            (user_id.as_i64(), category_code),
            map_budget_row,
        )
        .map_err(Error::from)
}

/// Get a user's active budgets, largest first, with what has been spent in each
/// budget's category.
pub fn get_active_budgets(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<BudgetWithSpending>, Error> {
    connection
        .prepare(
            "SELECT b.id, b.category_code, b.amount, b.period_type, b.is_active,
                b.created_at, b.updated_at, c.name,
                (SELECT COALESCE(SUM(t.total), 0) FROM \"transaction\" t
                 WHERE t.category_code = b.category_code) AS actual_spent
             FROM budget b
             INNER JOIN category c ON c.code = b.category_code
             WHERE b.user_id = ?1 AND b.is_active = 1
             ORDER BY b.amount DESC, b.id ASC",
        )?
        .query_map([user_id.as_i64()], |row| {
            Ok(BudgetWithSpending {
                budget: map_budget_row(row)?,
                category_name: row.get(7)?,
                actual_spent: row.get(8)?,
            })
        })?
        .map(|maybe_budget| maybe_budget.map_err(|error| error.into()))
        .collect()
}

/// Compare a user's total active budget against spending.
pub fn get_budget_summary(user_id: UserID, connection: &Connection) -> Result<BudgetSummary, Error> {
    let total_budget: i64 = connection.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM budget WHERE user_id = ?1 AND is_active = 1",
        [user_id.as_i64()],
        |row| row.get(0),
    )?;

    let total_spent: i64 = connection.query_row(
        "SELECT COALESCE(SUM(t.total), 0) FROM \"transaction\" t
         INNER JOIN budget b ON b.category_code = t.category_code
         WHERE b.user_id = ?1 AND b.is_active = 1",
        [user_id.as_i64()],
        |row| row.get(0),
    )?;

    let total_all_spent: i64 = connection.query_row(
        "SELECT COALESCE(SUM(total), 0) FROM \"transaction\"",
        [],
        |row| row.get(0),
    )?;

    Ok(BudgetSummary {
        total_budget,
        total_spent,
        total_all_spent,
        remaining: total_budget - total_spent,
    })
}

/// Partially update one of the user's budgets.
///
/// # Errors
/// Returns [Error::UpdateMissingBudget] if the user has no budget with `id`.
pub fn update_budget(
    user_id: UserID,
    id: BudgetId,
    update: BudgetUpdate,
    connection: &Connection,
) -> Result<Budget, Error> {
    if update.amount.is_some_and(|amount| amount < 0) {
        return Err(Error::NegativeAmount);
    }

    let rows_affected = connection.execute(
        "UPDATE budget SET
            amount = COALESCE(?1, amount),
            period_type = COALESCE(?2, period_type),
            is_active = COALESCE(?3, is_active),
            updated_at = ?4
         WHERE id = ?5 AND user_id = ?6",
        (
            update.amount,
            update.period_type,
            update.is_active,
            OffsetDateTime::now_utc(),
            id,
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingBudget);
    }

    connection
        .query_row(&format!("{SELECT_BUDGET} WHERE b.id = ?1"), [id], map_budget_row)
        .map_err(Error::from)
}

/// Delete one of the user's budgets.
///
/// # Errors
/// Returns [Error::DeleteMissingBudget] if the user has no budget with `id`.
pub fn delete_budget(user_id: UserID, id: BudgetId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM budget WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingBudget);
    }

    Ok(())
}

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        category_code: row.get(1)?,
        amount: row.get(2)?,
        period_type: row.get(3)?,
        is_active: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

#[cfg(test)]
mod budget_query_tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        Error,
        auth::{PasswordHash, User, create_user},
        budget::{
            BudgetSummary, BudgetUpdate, PeriodType, delete_budget, get_active_budgets,
            get_budget_summary, update_budget, upsert_budget,
        },
        category::{NewCategory, create_category},
        db::initialize,
        transaction::{Transaction, TransactionKind, create_transaction},
    };

    fn get_test_db() -> (Connection, User) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            "alice",
            "alice@example.com",
            &PasswordHash::new_unchecked("hunter2"),
            &connection,
        )
        .unwrap();
        create_category(
            NewCategory {
                code: "food".to_owned(),
                name: "Food".to_owned(),
            },
            &connection,
        )
        .unwrap();

        (connection, user)
    }

    fn spend(amount: i64, category: &str, connection: &Connection) {
        create_transaction(
            Transaction::build(TransactionKind::Debit, amount, datetime!(2025-03-01 9:00 UTC))
                .category_code(category),
            connection,
        )
        .unwrap();
    }

    #[test]
    fn upsert_replaces_and_reactivates() {
        let (connection, user) = get_test_db();
        let budget =
            upsert_budget(user.id, "food", 1000, PeriodType::Monthly, &connection).unwrap();
        update_budget(
            user.id,
            budget.id,
            BudgetUpdate {
                is_active: Some(false),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();

        let replaced =
            upsert_budget(user.id, "food", 2000, PeriodType::Weekly, &connection).unwrap();

        assert_eq!(replaced.id, budget.id);
        assert_eq!(replaced.amount, 2000);
        assert_eq!(replaced.period_type, PeriodType::Weekly);
        assert!(replaced.is_active);
    }

    #[test]
    fn upsert_unknown_category_fails() {
        let (connection, user) = get_test_db();

        let result = upsert_budget(user.id, "travel", 1000, PeriodType::Monthly, &connection);

        assert_eq!(result, Err(Error::InvalidCategory("travel".to_owned())));
    }

    #[test]
    fn active_budgets_include_spending() {
        let (connection, user) = get_test_db();
        upsert_budget(user.id, "food", 1000, PeriodType::Monthly, &connection).unwrap();
        upsert_budget(user.id, "other", 5000, PeriodType::Monthly, &connection).unwrap();
        spend(300, "food", &connection);
        spend(200, "food", &connection);

        let budgets = get_active_budgets(user.id, &connection).unwrap();

        assert_eq!(budgets.len(), 2);
        assert_eq!(budgets[0].budget.category_code, "other");
        assert_eq!(budgets[0].actual_spent, 0);
        assert_eq!(budgets[1].category_name, "Food");
        assert_eq!(budgets[1].actual_spent, 500);
    }

    #[test]
    fn inactive_budgets_are_hidden() {
        let (connection, user) = get_test_db();
        let budget =
            upsert_budget(user.id, "food", 1000, PeriodType::Monthly, &connection).unwrap();
        update_budget(
            user.id,
            budget.id,
            BudgetUpdate {
                is_active: Some(false),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();

        assert!(get_active_budgets(user.id, &connection).unwrap().is_empty());
    }

    #[test]
    fn summary_compares_budget_to_spending() {
        let (connection, user) = get_test_db();
        upsert_budget(user.id, "food", 1000, PeriodType::Monthly, &connection).unwrap();
        spend(300, "food", &connection);
        spend(700, "other", &connection);

        let summary = get_budget_summary(user.id, &connection).unwrap();

        assert_eq!(
            summary,
            BudgetSummary {
                total_budget: 1000,
                total_spent: 300,
                total_all_spent: 1000,
                remaining: 700,
            }
        );
    }

    #[test]
    fn update_and_delete_are_scoped_to_user() {
        let (connection, alice) = get_test_db();
        let bob = create_user(
            "bob",
            "bob@example.com",
            &PasswordHash::new_unchecked("hunter3"),
            &connection,
        )
        .unwrap();
        let budget =
            upsert_budget(alice.id, "food", 1000, PeriodType::Monthly, &connection).unwrap();

        assert_eq!(
            update_budget(bob.id, budget.id, BudgetUpdate::default(), &connection),
            Err(Error::UpdateMissingBudget)
        );
        assert_eq!(
            delete_budget(bob.id, budget.id, &connection),
            Err(Error::DeleteMissingBudget)
        );
        assert_eq!(delete_budget(alice.id, budget.id, &connection), Ok(()));
    }

    #[test]
    fn update_changes_only_given_fields() {
        let (connection, user) = get_test_db();
        let budget =
            upsert_budget(user.id, "food", 1000, PeriodType::Monthly, &connection).unwrap();

        let updated = update_budget(
            user.id,
            budget.id,
            BudgetUpdate {
                amount: Some(1500),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();

        assert_eq!(updated.amount, 1500);
        assert_eq!(updated.period_type, PeriodType::Monthly);
        assert!(updated.is_active);
    }
}
