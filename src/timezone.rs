//! Helpers for working with the configured local timezone.

use time::{OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::Error;

/// Get the current UTC offset of `canonical_timezone`, e.g. "Asia/Jakarta".
///
/// Returns `None` if the timezone name is not recognised.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Like [get_local_offset], but logs and returns an error for unknown timezones.
pub fn local_offset_or_error(canonical_timezone: &str) -> Result<UtcOffset, Error> {
    get_local_offset(canonical_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {canonical_timezone}");
        Error::InvalidTimezoneError(canonical_timezone.to_owned())
    })
}

/// The current time in `canonical_timezone`.
pub fn local_now(canonical_timezone: &str) -> Result<OffsetDateTime, Error> {
    let offset = local_offset_or_error(canonical_timezone)?;

    Ok(OffsetDateTime::now_utc().to_offset(offset))
}

/// Convert `date_time` to UTC, the offset timestamps are stored in.
///
/// # Errors
/// Returns [Error::DateOutOfRange] if the time in UTC falls outside the supported years.
pub fn to_utc(date_time: OffsetDateTime) -> Result<OffsetDateTime, Error> {
    date_time
        .checked_to_offset(UtcOffset::UTC)
        .ok_or_else(|| Error::DateOutOfRange(date_time.to_string()))
}
