//! Calendar helpers. All calendar math is UTC.

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

const MS_PER_DAY: u64 = 86_400_000;

/// Number of days in `month` (1-based) of `year`, leap years included.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(next.signed_duration_since(first).num_days() as u32)
}

/// Calendar `(year, month)` of an epoch-millisecond timestamp.
pub fn year_month_of(timestamp_ms: u64) -> Option<(i32, u32)> {
    let dt = to_datetime(timestamp_ms)?;
    Some((dt.year(), dt.month()))
}

/// Start of the UTC day containing `timestamp_ms`.
pub fn midnight_utc(timestamp_ms: u64) -> u64 {
    timestamp_ms - timestamp_ms % MS_PER_DAY
}

/// Smallest multiple of `step_ms` that is `>= timestamp_ms`.
pub fn ceil_to_multiple(timestamp_ms: u64, step_ms: u64) -> u64 {
    if step_ms == 0 {
        return timestamp_ms;
    }
    timestamp_ms.div_ceil(step_ms) * step_ms
}

/// RFC3339 with millisecond precision and `Z` suffix, the shape of `Date.toISOString()`.
pub fn format_rfc3339(timestamp_ms: u64) -> String {
    match to_datetime(timestamp_ms) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => timestamp_ms.to_string(),
    }
}

/// Parse a provider candle time: RFC3339, or Unix microseconds as a decimal string.
pub fn parse_candle_time(raw: &str) -> Option<u64> {
    if let Ok(micros) = raw.parse::<u64>() {
        return Some(micros / 1000);
    }
    let dt = DateTime::parse_from_rfc3339(raw).ok()?;
    u64::try_from(dt.timestamp_millis()).ok()
}

fn to_datetime(timestamp_ms: u64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(i64::try_from(timestamp_ms).ok()?)
}

/// Partial calendar fields; `None` keeps the field of the value being edited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeParams {
    pub year: Option<i32>,
    /// 1-based
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub hours: Option<u32>,
    pub minutes: Option<u32>,
    pub seconds: Option<u32>,
}

impl TimeParams {
    /// Overlay these fields on `base_ms`. `None` when the result is not a real instant.
    pub fn resolve(&self, base_ms: u64) -> Option<u64> {
        let base = to_datetime(base_ms)?;
        let resolved = Utc
            .with_ymd_and_hms(
                self.year.unwrap_or(base.year()),
                self.month.unwrap_or(base.month()),
                self.day.unwrap_or(base.day()),
                self.hours.unwrap_or(base.hour()),
                self.minutes.unwrap_or(base.minute()),
                self.seconds.unwrap_or(base.second()),
            )
            .single()?;
        u64::try_from(resolved.timestamp_millis()).ok()
    }
}
