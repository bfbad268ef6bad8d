//! # Calendar Helpers
//!
//! Local-day and ISO-week boundaries for a business at a fixed UTC offset.
//! Everything else in the crate works on raw epoch milliseconds.
//!
//! ```text
//!            local midnight                         next local midnight
//!  ──────────────┬──────────────── day ──────────────────┬──────────────►
//!                start                                   start + 24h
//!
//!  ISO week: Monday 00:00 local ──► the following Monday 00:00 local
//! ```

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, TimeZone};

use crate::error::{CoreResult, ValidationError};

/// Milliseconds in one day.
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Largest accepted offset, in minutes (UTC±14:00).
pub const MAX_OFFSET_MINUTES: i32 = 14 * 60;

fn fixed_offset(utc_offset_minutes: i32) -> CoreResult<FixedOffset> {
    if utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
        return Err(ValidationError::OutOfRange {
            field: "utc_offset_minutes".to_string(),
            min: -(MAX_OFFSET_MINUTES as i64),
            max: MAX_OFFSET_MINUTES as i64,
        }
        .into());
    }
    FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
        ValidationError::InvalidFormat {
            field: "utc_offset_minutes".to_string(),
            reason: "not a valid UTC offset".to_string(),
        }
        .into()
    })
}

fn local(ts: i64, tz: &FixedOffset) -> CoreResult<DateTime<FixedOffset>> {
    tz.timestamp_millis_opt(ts).single().ok_or_else(|| {
        ValidationError::InvalidFormat {
            field: "timestamp".to_string(),
            reason: "out of the supported date range".to_string(),
        }
        .into()
    })
}

fn midnight(ts: i64, tz: &FixedOffset) -> CoreResult<i64> {
    let day = local(ts, tz)?.date_naive();
    let start = NaiveTime::from_hms_opt(0, 0, 0)
        .and_then(|t| tz.from_local_datetime(&day.and_time(t)).single())
        .ok_or_else(|| ValidationError::InvalidFormat {
            field: "timestamp".to_string(),
            reason: "no local midnight".to_string(),
        })?;
    Ok(start.timestamp_millis())
}

/// `[start, end)` of the local day containing `now`.
///
/// ## Example
/// ```rust
/// use titan_core::calendar::{day_window, DAY_MS};
///
/// // 2024-03-05T02:00:00Z is still March 4th at UTC-05:00.
/// let now = 1_709_604_000_000;
/// let (start, end) = day_window(now, -300).unwrap();
/// assert_eq!(end - start, DAY_MS);
/// assert_eq!(start, 1_709_528_400_000); // 2024-03-04T05:00:00Z
/// ```
pub fn day_window(now: i64, utc_offset_minutes: i32) -> CoreResult<(i64, i64)> {
    let tz = fixed_offset(utc_offset_minutes)?;
    let start = midnight(now, &tz)?;
    Ok((start, start + DAY_MS))
}

/// Monday 00:00 local of the ISO week containing `ts`.
pub fn week_start(ts: i64, utc_offset_minutes: i32) -> CoreResult<i64> {
    let tz = fixed_offset(utc_offset_minutes)?;
    let days_since_monday = local(ts, &tz)?.weekday().num_days_from_monday() as i64;
    Ok(midnight(ts, &tz)? - days_since_monday * DAY_MS)
}

/// `YYYY-MM-DD HH:MM` in local time, for logs and reports.
pub fn format_local(ts: i64, utc_offset_minutes: i32) -> CoreResult<String> {
    let tz = fixed_offset(utc_offset_minutes)?;
    Ok(local(ts, &tz)?.format("%Y-%m-%d %H:%M").to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-06T12:00:00Z, a Wednesday.
    const WED_NOON: i64 = 1_709_726_400_000;

    #[test]
    fn test_day_window_utc() {
        let (start, end) = day_window(WED_NOON, 0).unwrap();
        assert_eq!(start, WED_NOON - 12 * 3_600_000);
        assert_eq!(end, start + DAY_MS);
    }

    #[test]
    fn test_week_start_is_monday_midnight() {
        let monday = week_start(WED_NOON, 0).unwrap();
        assert_eq!(monday, WED_NOON - 12 * 3_600_000 - 2 * DAY_MS);
        assert_eq!(format_local(monday, 0).unwrap(), "2024-03-04 00:00");
    }

    #[test]
    fn test_offset_shifts_the_day() {
        let (utc_start, _) = day_window(WED_NOON, 0).unwrap();
        let (east_start, _) = day_window(WED_NOON, 120).unwrap();
        assert_eq!(utc_start - east_start, 2 * 3_600_000);
    }

    #[test]
    fn test_bad_offset_rejected() {
        assert!(day_window(WED_NOON, 15 * 60).is_err());
    }
}
