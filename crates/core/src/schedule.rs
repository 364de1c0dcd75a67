//! Overdue detection and daily fire-time computation.

use chrono::{DateTime, Duration, TimeZone};

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// A rotation is overdue when the most recent success is older than this.
/// One hour beyond the nominal daily period tolerates scheduling jitter
/// without false-triggering.
pub const OVERDUE_WINDOW_HOURS: i64 = 25;

/// Default local fire time: 03:00.
pub const DEFAULT_ROTATION_HOUR: u32 = 3;
pub const DEFAULT_ROTATION_MINUTE: u32 = 0;

// ---------------------------------------------------------------------------
// Overdue detection
// ---------------------------------------------------------------------------

/// Whether a rotation should run because the last success is stale.
///
/// No recorded success at all counts as overdue. A success exactly on the
/// window boundary is still fresh.
pub fn is_overdue(last_success: Option<Timestamp>, now: Timestamp) -> bool {
    match last_success {
        Some(at) => now - at > Duration::hours(OVERDUE_WINDOW_HOURS),
        None => true,
    }
}

// ---------------------------------------------------------------------------
// Daily fire time
// ---------------------------------------------------------------------------

/// Next wall-clock instant strictly after `now` at `hour`:`minute` in the
/// timezone of `now`.
///
/// A local time that does not exist on a given day (DST spring-forward gap)
/// is skipped to the next day; an ambiguous local time (fall-back overlap)
/// resolves to the earlier instant.
pub fn next_daily_fire<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32, minute: u32) -> DateTime<Tz> {
    let tz = now.timezone();
    for day_offset in 0..=2 {
        let date = now.date_naive() + Duration::days(day_offset);
        let Some(naive) = date.and_hms_opt(hour, minute, 0) else {
            continue;
        };
        if let Some(candidate) = tz.from_local_datetime(&naive).earliest() {
            if candidate > *now {
                return candidate;
            }
        }
    }
    // Reached only for an hour/minute outside the valid range.
    now.clone() + Duration::days(1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    // -- is_overdue ---------------------------------------------------------

    #[test]
    fn no_recorded_success_is_overdue() {
        assert!(is_overdue(None, at(2025, 6, 2, 12, 0)));
    }

    #[test]
    fn success_24_hours_ago_is_fresh() {
        let now = at(2025, 6, 2, 12, 0);
        assert!(!is_overdue(Some(at(2025, 6, 1, 12, 0)), now));
    }

    #[test]
    fn success_exactly_on_window_boundary_is_fresh() {
        let now = at(2025, 6, 2, 13, 0);
        assert!(!is_overdue(Some(at(2025, 6, 1, 12, 0)), now));
    }

    #[test]
    fn success_26_hours_ago_is_overdue() {
        let now = at(2025, 6, 2, 14, 0);
        assert!(is_overdue(Some(at(2025, 6, 1, 12, 0)), now));
    }

    // -- next_daily_fire ----------------------------------------------------

    #[test]
    fn fires_later_today_when_target_ahead() {
        let now = at(2025, 6, 1, 1, 30);
        let fire = next_daily_fire(&now, 3, 0);
        assert_eq!(fire, at(2025, 6, 1, 3, 0));
    }

    #[test]
    fn fires_tomorrow_when_target_passed() {
        let now = at(2025, 6, 1, 4, 0);
        let fire = next_daily_fire(&now, 3, 0);
        assert_eq!(fire, at(2025, 6, 2, 3, 0));
    }

    #[test]
    fn exact_target_time_fires_next_day() {
        let now = at(2025, 6, 1, 3, 0);
        let fire = next_daily_fire(&now, 3, 0);
        assert_eq!(fire, at(2025, 6, 2, 3, 0));
    }

    #[test]
    fn minute_component_is_respected() {
        let now = at(2025, 6, 1, 3, 15);
        let fire = next_daily_fire(&now, 3, 30);
        assert_eq!(fire, at(2025, 6, 1, 3, 30));
    }

    #[test]
    fn rolls_over_month_boundary() {
        let now = at(2025, 6, 30, 23, 59);
        let fire = next_daily_fire(&now, 3, 0);
        assert_eq!(fire, at(2025, 7, 1, 3, 0));
    }
}
