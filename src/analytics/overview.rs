//! The dashboard overview endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::Serialize;
use time::{OffsetDateTime, UtcOffset};

use crate::{
    AppState, Error,
    analytics::aggregation::{
        CategoryTotal, ChannelTotal, DailyTotal, MerchantTotal, Summary, get_category_breakdown,
        get_channel_breakdown, get_daily_trend, get_summary, get_top_merchants,
    },
    auth::UserID,
    budget::{budget_period, get_budget_cycle_start_day},
    db::lock_connection,
    timezone::local_offset_or_error,
    transaction::{Transaction, get_recent_transactions},
};

const RECENT_TRANSACTION_COUNT: u64 = 5;

/// The state needed for the analytics endpoints.
#[derive(Debug, Clone)]
pub struct AnalyticsState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The canonical timezone that days and months are reported in.
    pub local_timezone: String,
}

impl FromRef<AppState> for AnalyticsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The current budget cycle, for display alongside the overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewPeriod {
    pub start_day: u8,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub period: OverviewPeriod,
    pub summary: Summary,
    pub category_breakdown: Vec<CategoryTotal>,
    pub daily_trend: Vec<DailyTotal>,
    pub recent_transactions: Vec<Transaction>,
    pub channel_breakdown: Vec<ChannelTotal>,
    pub top_merchants: Vec<MerchantTotal>,
}

/// Get the dashboard overview for the current user.
pub async fn get_overview_endpoint(
    State(state): State<AnalyticsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Overview>, Error> {
    let local_offset = local_offset_or_error(&state.local_timezone)?;
    let now = OffsetDateTime::now_utc().to_offset(local_offset);
    let connection = lock_connection(&state.db_connection)?;

    build_overview(user_id, now, &connection).map(Json)
}

/// Compute the overview with `now` as the current local time.
pub fn build_overview(
    user_id: UserID,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Overview, Error> {
    let start_day = get_budget_cycle_start_day(user_id, connection)?;
    let period = budget_period(start_day, now);
    let local_offset: UtcOffset = now.offset();

    Ok(Overview {
        period: OverviewPeriod {
            start_day: start_day.day(),
            start_date: period.start,
            end_date: period.end,
        },
        summary: get_summary(connection)?,
        category_breakdown: get_category_breakdown(connection)?,
        daily_trend: get_daily_trend(local_offset, connection)?,
        recent_transactions: get_recent_transactions(RECENT_TRANSACTION_COUNT, connection)?,
        channel_breakdown: get_channel_breakdown(connection)?,
        top_merchants: get_top_merchants(connection)?,
    })
}
