//! Read-only aggregate queries over all transactions for the dashboard.
//!
//! Days and months are bucketed in the local timezone given as a UTC offset.

use rusqlite::Connection;
use serde::Serialize;
use time::{OffsetDateTime, UtcOffset};

use crate::{Error, timezone::to_utc};

/// Overall totals.
///
/// Income counts credits only while expense counts every transaction, so the
/// balance is income minus all money moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_income: i64,
    pub total_expense: i64,
    pub balance: i64,
    pub transaction_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub code: String,
    pub name: String,
    pub total: i64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTotal {
    /// The local date as YYYY-MM-DD.
    pub date: String,
    pub expense: i64,
    pub income: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelTotal {
    pub channel: String,
    pub total: i64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MerchantTotal {
    pub merchant: String,
    pub total: i64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyTotal {
    /// The local month as YYYY-MM.
    pub month: String,
    pub income: i64,
    pub expense: i64,
    pub savings: i64,
}

const TOP_LIMIT: u32 = 10;

/// An SQLite date modifier that shifts UTC timestamps into `offset`, e.g. "+420 minutes".
fn offset_modifier(offset: UtcOffset) -> String {
    format!("{:+} minutes", offset.whole_minutes())
}

pub fn get_summary(connection: &Connection) -> Result<Summary, Error> {
    let (total_income, total_expense, transaction_count): (i64, i64, i64) = connection
        .query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN kind = 'credit' THEN total ELSE 0 END), 0),
                COALESCE(SUM(total), 0),
                COUNT(id)
             FROM \"transaction\"",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

    Ok(Summary {
        total_income,
        total_expense,
        balance: total_income - total_expense,
        transaction_count,
    })
}

/// The ten categories with the largest non-zero totals.
pub fn get_category_breakdown(connection: &Connection) -> Result<Vec<CategoryTotal>, Error> {
    connection
        .prepare(
            "SELECT c.code, c.name, COALESCE(SUM(t.total), 0) AS category_total, COUNT(t.id)
             FROM category c
             LEFT JOIN \"transaction\" t ON t.category_code = c.code
             GROUP BY c.code, c.name
             HAVING category_total > 0
             ORDER BY category_total DESC, c.code ASC
             LIMIT ?1",
        )?
        .query_map([TOP_LIMIT], |row| {
            Ok(CategoryTotal {
                code: row.get(0)?,
                name: row.get(1)?,
                total: row.get(2)?,
                count: row.get(3)?,
            })
        })?
        .map(|maybe_total| maybe_total.map_err(|error| error.into()))
        .collect()
}

/// Totals per local day, oldest first.
pub fn get_daily_trend(
    local_offset: UtcOffset,
    connection: &Connection,
) -> Result<Vec<DailyTotal>, Error> {
    connection
        .prepare(
            "SELECT DATE(occurred_at, ?1) AS day,
                COALESCE(SUM(total), 0),
                COALESCE(SUM(CASE WHEN kind = 'credit' THEN total ELSE 0 END), 0)
             FROM \"transaction\"
             GROUP BY day
             ORDER BY day ASC",
        )?
        .query_map([offset_modifier(local_offset)], |row| {
            Ok(DailyTotal {
                date: row.get(0)?,
                expense: row.get(1)?,
                income: row.get(2)?,
            })
        })?
        .map(|maybe_total| maybe_total.map_err(|error| error.into()))
        .collect()
}

/// Totals per channel, largest first.
pub fn get_channel_breakdown(connection: &Connection) -> Result<Vec<ChannelTotal>, Error> {
    connection
        .prepare(
            "SELECT channel, COALESCE(SUM(total), 0) AS channel_total, COUNT(id)
             FROM \"transaction\"
             GROUP BY channel
             ORDER BY channel_total DESC, channel ASC",
        )?
        .query_map([], |row| {
            Ok(ChannelTotal {
                channel: row.get(0)?,
                total: row.get(1)?,
                count: row.get(2)?,
            })
        })?
        .map(|maybe_total| maybe_total.map_err(|error| error.into()))
        .collect()
}

/// The ten merchants with the largest totals.
pub fn get_top_merchants(connection: &Connection) -> Result<Vec<MerchantTotal>, Error> {
    connection
        .prepare(
            "SELECT merchant, COALESCE(SUM(total), 0) AS merchant_total, COUNT(id)
             FROM \"transaction\"
             WHERE merchant IS NOT NULL
             GROUP BY merchant
             ORDER BY merchant_total DESC, merchant ASC
             LIMIT ?1",
        )?
        .query_map([TOP_LIMIT], |row| {
            Ok(MerchantTotal {
                merchant: row.get(0)?,
                total: row.get(1)?,
                count: row.get(2)?,
            })
        })?
        .map(|maybe_total| maybe_total.map_err(|error| error.into()))
        .collect()
}

/// Income, expense and savings per local month for transactions since `since`, oldest first.
///
/// Unlike [get_summary], expense only counts debits.
pub fn get_monthly_comparison(
    since: OffsetDateTime,
    local_offset: UtcOffset,
    connection: &Connection,
) -> Result<Vec<MonthlyTotal>, Error> {
    connection
        .prepare(
            "SELECT strftime('%Y-%m', occurred_at, ?1) AS month,
                COALESCE(SUM(CASE WHEN kind = 'credit' THEN total ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN kind = 'debit' THEN total ELSE 0 END), 0)
             FROM \"transaction\"
             WHERE occurred_at >= ?2
             GROUP BY month
             ORDER BY month ASC",
        )?
        .query_map(
            (offset_modifier(local_offset), to_utc(since)?),
            |row| {
                let income: i64 = row.get(1)?;
                let expense: i64 = row.get(2)?;

                Ok(MonthlyTotal {
                    month: row.get(0)?,
                    income,
                    expense,
                    savings: income - expense,
                })
            },
        )?
        .map(|maybe_total| maybe_total.map_err(|error| error.into()))
        .collect()
}

#[cfg(test)]
mod aggregation_tests {
    use rusqlite::Connection;
    use time::{
        OffsetDateTime,
        macros::{datetime, offset},
    };

    use crate::{
        analytics::aggregation::{
            ChannelTotal, DailyTotal, MonthlyTotal, Summary, get_category_breakdown,
            get_channel_breakdown, get_daily_trend, get_monthly_comparison, get_summary,
            get_top_merchants, offset_modifier,
        },
        category::{NewCategory, create_category},
        db::initialize,
        transaction::{Transaction, TransactionKind, create_transaction},
    };

    fn add(
        kind: TransactionKind,
        amount: i64,
        occurred_at: OffsetDateTime,
        merchant: Option<&str>,
        channel: &str,
        category: &str,
        connection: &Connection,
    ) {
        create_transaction(
            Transaction::build(kind, amount, occurred_at)
                .merchant(merchant.map(str::to_owned))
                .channel(channel)
                .category_code(category),
            connection,
        )
        .unwrap();
    }

    fn get_test_db() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        for (code, name) in [("food", "Food"), ("salary", "Salary"), ("unused", "Unused")] {
            create_category(
                NewCategory {
                    code: code.to_owned(),
                    name: name.to_owned(),
                },
                &connection,
            )
            .unwrap();
        }

        use TransactionKind::{Credit, Debit};
        add(Credit, 10_000, datetime!(2025-01-31 20:00 UTC), None, "bca", "salary", &connection);
        add(Debit, 3_000, datetime!(2025-02-01 05:00 +7), Some("Warung"), "gopay", "food", &connection);
        add(Debit, 1_000, datetime!(2025-02-01 12:00 +7), Some("Warung"), "gopay", "food", &connection);
        add(Debit, 500, datetime!(2025-03-15 12:00 +7), Some("Toko"), "bca", "other", &connection);

        connection
    }

    #[test]
    fn offset_modifier_is_signed_minutes() {
        assert_eq!(offset_modifier(offset!(+7)), "+420 minutes");
        assert_eq!(offset_modifier(offset!(-5:30)), "-330 minutes");
    }

    #[test]
    fn summary_counts_all_totals_as_expense() {
        let connection = get_test_db();

        assert_eq!(
            get_summary(&connection).unwrap(),
            Summary {
                total_income: 10_000,
                total_expense: 14_500,
                balance: -4_500,
                transaction_count: 4,
            }
        );
    }

    #[test]
    fn category_breakdown_skips_empty_categories() {
        let connection = get_test_db();

        let breakdown = get_category_breakdown(&connection).unwrap();

        let codes: Vec<&str> = breakdown.iter().map(|total| total.code.as_str()).collect();
        assert_eq!(codes, vec!["salary", "food", "other"]);
        assert_eq!(breakdown[1].total, 4_000);
        assert_eq!(breakdown[1].count, 2);
    }

    #[test]
    fn daily_trend_uses_local_dates() {
        let connection = get_test_db();

        let trend = get_daily_trend(offset!(+7), &connection).unwrap();

        assert_eq!(
            trend,
            vec![
                DailyTotal {
                    date: "2025-02-01".to_owned(),
                    expense: 14_000,
                    income: 10_000,
                },
                DailyTotal {
                    date: "2025-03-15".to_owned(),
                    expense: 500,
                    income: 0,
                },
            ]
        );
    }

    #[test]
    fn channel_breakdown_is_largest_first() {
        let connection = get_test_db();

        assert_eq!(
            get_channel_breakdown(&connection).unwrap(),
            vec![
                ChannelTotal {
                    channel: "bca".to_owned(),
                    total: 10_500,
                    count: 2,
                },
                ChannelTotal {
                    channel: "gopay".to_owned(),
                    total: 4_000,
                    count: 2,
                },
            ]
        );
    }

    #[test]
    fn top_merchants_ignore_missing_merchant() {
        let connection = get_test_db();

        let merchants = get_top_merchants(&connection).unwrap();

        assert_eq!(merchants.len(), 2);
        assert_eq!(merchants[0].merchant, "Warung");
        assert_eq!(merchants[0].total, 4_000);
        assert_eq!(merchants[1].merchant, "Toko");
    }

    #[test]
    fn monthly_comparison_buckets_local_months() {
        let connection = get_test_db();

        let months = get_monthly_comparison(
            datetime!(2025-02-01 0:00 +7),
            offset!(+7),
            &connection,
        )
        .unwrap();

        assert_eq!(
            months,
            vec![
                MonthlyTotal {
                    month: "2025-02".to_owned(),
                    income: 10_000,
                    expense: 4_000,
                    savings: 6_000,
                },
                MonthlyTotal {
                    month: "2025-03".to_owned(),
                    income: 0,
                    expense: 500,
                    savings: -500,
                },
            ]
        );
    }

    #[test]
    fn empty_database_has_zero_summary() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        assert_eq!(get_summary(&connection).unwrap().transaction_count, 0);
        assert!(get_category_breakdown(&connection).unwrap().is_empty());
        assert!(get_daily_trend(offset!(+7), &connection).unwrap().is_empty());
    }
}
