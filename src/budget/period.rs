//! Budget cycles that start on a configurable day of the month rather than on the 1st,
//! e.g. to line up with pay day.

use std::fmt::Display;

use rusqlite::Connection;
use serde::Serialize;
use serde_json::{Value, json};
use time::{Date, Duration, Month, OffsetDateTime, macros::time};

use crate::{Error, auth::UserID, settings::get_setting};

/// The settings key that stores the day of the month budget cycles start on.
pub const BUDGET_CYCLE_SETTING_KEY: &str = "budget_cycle_start_day";

/// The day of the month a budget cycle starts on.
///
/// Limited to 1-28 so that every month has the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BudgetCycleStartDay(u8);

impl BudgetCycleStartDay {
    /// The earliest allowed start day.
    pub const MIN: u8 = 1;
    /// The latest allowed start day.
    pub const MAX: u8 = 28;

    /// Create a start day.
    ///
    /// # Errors
    /// Returns [Error::InvalidCycleStartDay] if `day` is not in 1-28.
    pub fn new(day: i64) -> Result<Self, Error> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&day) {
            Ok(Self(day as u8))
        } else {
            Err(Error::InvalidCycleStartDay(day.to_string()))
        }
    }

    pub fn day(&self) -> u8 {
        self.0
    }

    /// Parse the start day from its stored setting value, `{"day": n}`.
    pub fn from_setting_value(value: &Value) -> Result<Self, Error> {
        let day = value
            .get("day")
            .ok_or_else(|| Error::InvalidCycleStartDay(value.to_string()))?;

        match day.as_i64() {
            Some(day) => Self::new(day),
            None => Err(Error::InvalidCycleStartDay(day.to_string())),
        }
    }

    pub fn to_setting_value(&self) -> Value {
        json!({ "day": self.0 })
    }
}

impl Default for BudgetCycleStartDay {
    fn default() -> Self {
        Self(25)
    }
}

impl Display for BudgetCycleStartDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The first and last instants of a budget cycle, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BudgetPeriod {
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
}

/// Get the budget cycle that contains `reference`.
///
/// The cycle starts at midnight on `start_day` and ends at the last instant of
/// the day before the next cycle starts. Both bounds use the offset of `reference`.
pub fn budget_period(start_day: BudgetCycleStartDay, reference: OffsetDateTime) -> BudgetPeriod {
    let offset = reference.offset();
    let date = reference.date();

    let (start_year, start_month) = if date.day() >= start_day.day() {
        (date.year(), date.month())
    } else {
        previous_month(date.year(), date.month())
    };
    let (next_year, next_month) = next_month(start_year, start_month);

    let start = cycle_date(start_year, start_month, start_day);
    let end = cycle_date(next_year, next_month, start_day) - Duration::DAY;

    BudgetPeriod {
        start: start.midnight().assume_offset(offset),
        end: end
            .with_time(time!(23:59:59.999_999_999))
            .assume_offset(offset),
    }
}

/// Read the user's budget cycle start day, falling back to the default when the
/// setting is missing or malformed.
pub fn get_budget_cycle_start_day(
    user_id: UserID,
    connection: &Connection,
) -> Result<BudgetCycleStartDay, Error> {
    match get_setting(user_id, BUDGET_CYCLE_SETTING_KEY, connection) {
        Ok(value) => Ok(BudgetCycleStartDay::from_setting_value(&value).unwrap_or_else(|error| {
            tracing::warn!("Ignoring malformed budget cycle setting for user {user_id}: {error}");
            BudgetCycleStartDay::default()
        })),
        Err(Error::MissingSetting) => Ok(BudgetCycleStartDay::default()),
        Err(error) => Err(error),
    }
}

fn cycle_date(year: i32, month: Month, start_day: BudgetCycleStartDay) -> Date {
    // Every month has days 1-28.
    Date::from_calendar_date(year, month, start_day.day()).expect("invalid budget cycle date")
}

fn next_month(year: i32, month: Month) -> (i32, Month) {
    match month {
        Month::December => (year + 1, Month::January),
        month => (year, month.next()),
    }
}

fn previous_month(year: i32, month: Month) -> (i32, Month) {
    match month {
        Month::January => (year - 1, Month::December),
        month => (year, month.previous()),
    }
}

#[cfg(test)]
mod budget_period_tests {
    use rusqlite::Connection;
    use serde_json::json;
    use time::macros::{datetime, offset};

    use crate::{
        Error,
        auth::{PasswordHash, create_user},
        budget::period::{
            BUDGET_CYCLE_SETTING_KEY, BudgetCycleStartDay, BudgetPeriod, budget_period,
            get_budget_cycle_start_day,
        },
        db::initialize,
        settings::upsert_setting,
    };

    fn day(day: i64) -> BudgetCycleStartDay {
        BudgetCycleStartDay::new(day).unwrap()
    }

    #[test]
    fn reference_before_start_day_uses_previous_month() {
        let period = budget_period(day(25), datetime!(2025-03-10 12:00 +7));

        assert_eq!(
            period,
            BudgetPeriod {
                start: datetime!(2025-02-25 0:00 +7),
                end: datetime!(2025-03-24 23:59:59.999_999_999 +7),
            }
        );
    }

    #[test]
    fn reference_on_start_day_starts_new_cycle() {
        let period = budget_period(day(25), datetime!(2025-03-25 0:00 +7));

        assert_eq!(period.start, datetime!(2025-03-25 0:00 +7));
        assert_eq!(period.end, datetime!(2025-04-24 23:59:59.999_999_999 +7));
    }

    #[test]
    fn cycle_crosses_into_previous_year() {
        let period = budget_period(day(25), datetime!(2025-01-10 8:00 UTC));

        assert_eq!(period.start, datetime!(2024-12-25 0:00 UTC));
        assert_eq!(period.end, datetime!(2025-01-24 23:59:59.999_999_999 UTC));
    }

    #[test]
    fn cycle_crosses_into_next_year() {
        let period = budget_period(day(25), datetime!(2024-12-26 8:00 UTC));

        assert_eq!(period.start, datetime!(2024-12-25 0:00 UTC));
        assert_eq!(period.end, datetime!(2025-01-24 23:59:59.999_999_999 UTC));
    }

    #[test]
    fn start_day_one_ends_on_last_day_of_month() {
        let period = budget_period(day(1), datetime!(2024-02-15 8:00 UTC));

        assert_eq!(period.start, datetime!(2024-02-01 0:00 UTC));
        assert_eq!(period.end, datetime!(2024-02-29 23:59:59.999_999_999 UTC));
    }

    #[test]
    fn period_keeps_reference_offset() {
        let period = budget_period(day(25), datetime!(2025-03-10 12:00 +7));

        assert_eq!(period.start.offset(), offset!(+7));
        assert_eq!(period.end.offset(), offset!(+7));
    }

    #[test]
    fn start_day_must_be_in_range() {
        assert_eq!(
            BudgetCycleStartDay::new(0),
            Err(Error::InvalidCycleStartDay("0".to_owned()))
        );
        assert_eq!(
            BudgetCycleStartDay::new(29),
            Err(Error::InvalidCycleStartDay("29".to_owned()))
        );
        assert!(BudgetCycleStartDay::new(28).is_ok());
    }

    #[test]
    fn parses_setting_value() {
        assert_eq!(
            BudgetCycleStartDay::from_setting_value(&json!({ "day": 15 })),
            Ok(day(15))
        );
        assert!(BudgetCycleStartDay::from_setting_value(&json!({ "day": "15" })).is_err());
        assert!(BudgetCycleStartDay::from_setting_value(&json!(15)).is_err());
        assert_eq!(day(10).to_setting_value(), json!({ "day": 10 }));
    }

    #[test]
    fn start_day_setting_falls_back_to_default() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            "alice",
            "alice@example.com",
            &PasswordHash::new_unchecked("hunter2"),
            &connection,
        )
        .unwrap();

        assert_eq!(
            get_budget_cycle_start_day(user.id, &connection),
            Ok(BudgetCycleStartDay::default())
        );

        upsert_setting(user.id, BUDGET_CYCLE_SETTING_KEY, &json!({ "day": 3 }), &connection)
            .unwrap();
        assert_eq!(get_budget_cycle_start_day(user.id, &connection), Ok(day(3)));

        upsert_setting(user.id, BUDGET_CYCLE_SETTING_KEY, &json!("bogus"), &connection)
            .unwrap();
        assert_eq!(
            get_budget_cycle_start_day(user.id, &connection),
            Ok(BudgetCycleStartDay::default())
        );
    }
}
