//! The month-by-month comparison endpoint.

use axum::{Json, extract::State};
use rusqlite::Connection;
use serde::Serialize;
use time::{Date, Month, OffsetDateTime};

use crate::{
    Error,
    analytics::{
        aggregation::{MonthlyTotal, get_monthly_comparison},
        overview::AnalyticsState,
    },
    db::lock_connection,
    timezone::local_now,
};

/// How many months back the comparison covers.
pub const MONTHLY_WINDOW: u8 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyComparison {
    pub data: Vec<MonthlyTotal>,
}

/// Get income, expense and savings for each of the last six months.
pub async fn get_monthly_endpoint(
    State(state): State<AnalyticsState>,
) -> Result<Json<MonthlyComparison>, Error> {
    let now = local_now(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    monthly_comparison(now, &connection).map(Json)
}

/// Compare the months from [MONTHLY_WINDOW] months before `now` up to `now`.
pub fn monthly_comparison(
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<MonthlyComparison, Error> {
    let since = months_before(now, MONTHLY_WINDOW);
    let data = get_monthly_comparison(since, now.offset(), connection)?;

    Ok(MonthlyComparison { data })
}

/// The same day and time `months` months earlier, with the day clamped to the
/// length of the earlier month.
fn months_before(date_time: OffsetDateTime, months: u8) -> OffsetDateTime {
    let mut year = date_time.year();
    let mut month = date_time.month();
    for _ in 0..months {
        if month == Month::January {
            year -= 1;
        }
        month = month.previous();
    }

    let date = (1..=date_time.day())
        .rev()
        .find_map(|day| Date::from_calendar_date(year, month, day).ok())
        .unwrap_or(date_time.date());

    date_time.replace_date(date)
}
