//! Resolves the current date in the configured local timezone.

use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

/// The current UTC offset of `canonical_timezone`, e.g. "Europe/Istanbul".
///
/// Returns `None` if the timezone name is not known.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Today's date in `canonical_timezone`.
///
/// Falls back to the UTC date if the timezone name is not known.
pub fn local_today(canonical_timezone: &str) -> Date {
    let now = OffsetDateTime::now_utc();

    match get_local_offset(canonical_timezone) {
        Some(offset) => now.to_offset(offset).date(),
        None => {
            tracing::warn!("Unknown timezone {canonical_timezone:?}, using the UTC date");
            now.date()
        }
    }
}
