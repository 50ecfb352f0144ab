//! Database operations for categories.

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{
    Error,
    category::{Category, CategoryStats, NewCategory},
    transaction::{DEFAULT_CATEGORY, DateRange},
};

/// Create a category.
///
/// # Errors
/// Returns [Error::DuplicateCategoryCode] if the code is taken.
pub fn create_category(category: NewCategory, connection: &Connection) -> Result<Category, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection
        .execute(
            "INSERT INTO category (code, name, created_at) VALUES (?1, ?2, ?3)",
            (&category.code, &category.name, created_at),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code:
                        rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                        | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateCategoryCode(category.code.clone()),
            error => error.into(),
        })?;

    Ok(Category {
        code: category.code,
        name: category.name,
        created_at,
    })
}

/// Retrieve all categories ordered alphabetically by name.
pub fn get_all_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT code, name, created_at FROM category ORDER BY name ASC;")?
        .query_map([], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Retrieve all categories with the count and total of their transactions
/// within `range`, largest total first.
///
/// Categories without transactions are included with zero totals.
pub fn get_categories_with_stats(
    range: &DateRange,
    connection: &Connection,
) -> Result<Vec<CategoryStats>, Error> {
    let (start_date, end_date) = range.utc_bounds()?;

    connection
        .prepare(
            "SELECT c.code, c.name, COUNT(t.id), COALESCE(SUM(t.total), 0) AS total_amount
             FROM category c
             LEFT JOIN \"transaction\" t ON t.category_code = c.code
                AND (?1 IS NULL OR t.occurred_at >= ?1)
                AND (?2 IS NULL OR t.occurred_at <= ?2)
             GROUP BY c.code, c.name
             ORDER BY total_amount DESC, c.name ASC",
        )?
        .query_map((start_date, end_date), |row| {
            Ok(CategoryStats {
                code: row.get(0)?,
                name: row.get(1)?,
                transaction_count: row.get(2)?,
                total_amount: row.get(3)?,
            })
        })?
        .map(|maybe_stats| maybe_stats.map_err(|error| error.into()))
        .collect()
}

/// Rename a category. Returns an error if the category doesn't exist.
pub fn update_category_name(
    code: &str,
    name: &str,
    connection: &Connection,
) -> Result<Category, Error> {
    let rows_affected = connection.execute(
        "UPDATE category SET name = ?1 WHERE code = ?2",
        (name, code),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    connection
        .query_row(
            "SELECT code, name, created_at FROM category WHERE code = ?1",
            [code],
            map_row,
        )
        .map_err(Error::from)
}

/// Delete a category by code.
///
/// # Errors
/// Returns [Error::CategoryInUse] if any transaction has the category, or
/// [Error::DeleteMissingCategory] if the category doesn't exist.
pub fn delete_category(code: &str, connection: &Connection) -> Result<(), Error> {
    let usage_count: i64 = connection.query_row(
        "SELECT COUNT(id) FROM \"transaction\" WHERE category_code = ?1",
        [code],
        |row| row.get(0),
    )?;

    if usage_count > 0 {
        return Err(Error::CategoryInUse(code.to_owned()));
    }

    let rows_affected = connection.execute("DELETE FROM category WHERE code = ?1", [code])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    Ok(())
}

/// Initialize the category table.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            code TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_category_name ON category(name);",
    )?;

    Ok(())
}

/// Insert the fallback category used when a transaction has no category.
pub fn seed_default_categories(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "INSERT OR IGNORE INTO category (code, name, created_at) VALUES (?1, 'Other', ?2)",
        (DEFAULT_CATEGORY, OffsetDateTime::now_utc()),
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        code: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

#[cfg(test)]
mod category_query_tests {
    use rusqlite::Connection;
    use time::{Duration, macros::datetime};

    use crate::{
        Error,
        category::{
            NewCategory, create_category, delete_category, get_all_categories,
            get_categories_with_stats, update_category_name,
        },
        db::initialize,
        transaction::{DateRange, Transaction, TransactionKind, create_transaction},
    };

    fn get_test_db_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).expect("Could not initialize database");
        connection
    }

    fn new_category(code: &str, name: &str) -> NewCategory {
        NewCategory {
            code: code.to_owned(),
            name: name.to_owned(),
        }
    }

    #[test]
    fn lists_categories_by_name() {
        let connection = get_test_db_connection();
        create_category(new_category("transport", "Transport"), &connection).unwrap();
        create_category(new_category("food", "Food"), &connection).unwrap();

        let names: Vec<String> = get_all_categories(&connection)
            .unwrap()
            .into_iter()
            .map(|category| category.name)
            .collect();

        assert_eq!(names, vec!["Food", "Other", "Transport"]);
    }

    #[test]
    fn duplicate_code_is_rejected() {
        let connection = get_test_db_connection();
        create_category(new_category("food", "Food"), &connection).unwrap();

        let result = create_category(new_category("food", "Groceries"), &connection);

        assert_eq!(result, Err(Error::DuplicateCategoryCode("food".to_owned())));
    }

    #[test]
    fn stats_include_empty_categories_and_respect_range() {
        let connection = get_test_db_connection();
        create_category(new_category("food", "Food"), &connection).unwrap();
        let start = datetime!(2025-03-01 0:00 UTC);
        for (amount, day) in [(100, 0), (250, 5), (400, 40)] {
            create_transaction(
                Transaction::build(TransactionKind::Debit, amount, start + Duration::days(day))
                    .category_code("food"),
                &connection,
            )
            .unwrap();
        }
        let range = DateRange {
            start_date: Some(start),
            end_date: Some(start + Duration::days(30)),
        };

        let stats = get_categories_with_stats(&range, &connection).unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].code, "food");
        assert_eq!(stats[0].transaction_count, 2);
        assert_eq!(stats[0].total_amount, 350);
        assert_eq!(stats[1].code, "other");
        assert_eq!(stats[1].transaction_count, 0);
        assert_eq!(stats[1].total_amount, 0);
    }

    #[test]
    fn rename_category() {
        let connection = get_test_db_connection();
        create_category(new_category("food", "Food"), &connection).unwrap();

        let category = update_category_name("food", "Food & Drink", &connection).unwrap();

        assert_eq!(category.name, "Food & Drink");
        assert_eq!(
            update_category_name("nope", "Nope", &connection),
            Err(Error::UpdateMissingCategory)
        );
    }

    #[test]
    fn delete_unused_category() {
        let connection = get_test_db_connection();
        create_category(new_category("food", "Food"), &connection).unwrap();

        delete_category("food", &connection).unwrap();

        assert_eq!(get_all_categories(&connection).unwrap().len(), 1);
        assert_eq!(
            delete_category("food", &connection),
            Err(Error::DeleteMissingCategory)
        );
    }

    #[test]
    fn delete_category_in_use_fails() {
        let connection = get_test_db_connection();
        create_transaction(
            Transaction::build(TransactionKind::Debit, 1, datetime!(2025-03-01 0:00 UTC)),
            &connection,
        )
        .unwrap();

        let result = delete_category("other", &connection);

        assert_eq!(result, Err(Error::CategoryInUse("other".to_owned())));
    }
}
