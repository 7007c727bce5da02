//! Occurrence resolution.
//!
//! Computes, for a schedule and a reference instant, the next concrete
//! local date-time at which it fires and the canonical key identifying
//! that occurrence.

use crate::schedule::model::{Repeat, Schedule};
use chrono::{Datelike, Days, NaiveDateTime, Timelike};

/// Forward scan window for weekly rules. Two full weeks, so any non-empty
/// day set always produces a candidate.
const SCAN_WINDOW_DAYS: u64 = 14;

/// One concrete date-time instance at which a schedule fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// Local wall-clock instant of the occurrence.
    pub at: NaiveDateTime,
    /// Calendar-date key (`YYYY-MM-DD`) identifying this occurrence.
    pub key: String,
    /// Whether the schedule recurs.
    pub repeating: bool,
}

/// Resolve the next occurrence of `schedule` at or after `reference`.
///
/// Weekly rules scan forward from the reference (truncated to whole minutes)
/// and return the earliest candidate at or after it; exact equality counts
/// as a valid, un-missed occurrence, which is what allows same-minute
/// catch-up firing. One-off schedules resolve to their anchor date, or
/// `None` when no anchor is set.
pub fn resolve(schedule: &Schedule, reference: NaiveDateTime) -> Option<Occurrence> {
    match &schedule.repeat {
        Some(Repeat::Weekly { days }) if !days.is_empty() => {
            let floor = minute_floor(reference);
            for offset in 0..SCAN_WINDOW_DAYS {
                let day = reference.date().checked_add_days(Days::new(offset))?;
                let weekday = day.weekday().num_days_from_sunday() as u8;
                if !days.contains(&weekday) {
                    continue;
                }
                let at = day.and_time(schedule.time);
                if at >= floor {
                    return Some(Occurrence {
                        at,
                        key: day.format("%Y-%m-%d").to_string(),
                        repeating: true,
                    });
                }
            }
            None
        }
        _ => {
            let date = schedule.date?;
            Some(Occurrence {
                at: date.and_time(schedule.time),
                key: date.format("%Y-%m-%d").to_string(),
                repeating: false,
            })
        }
    }
}

/// Truncate an instant to the whole minute.
pub(crate) fn minute_floor(instant: NaiveDateTime) -> NaiveDateTime {
    instant
        .with_second(0)
        .and_then(|i| i.with_nanosecond(0))
        .unwrap_or(instant)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::schedule::model::Schedule;
    use chrono::{NaiveDate, NaiveTime};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn weekly(days: Vec<u8>, h: u32, min: u32) -> Schedule {
        Schedule::new("w", None, NaiveTime::from_hms_opt(h, min, 0).unwrap()).with_repeat(days)
    }

    #[test]
    fn one_off_resolves_to_anchor_date() {
        let schedule = Schedule::new(
            "dentist",
            NaiveDate::from_ymd_opt(2026, 9, 3),
            NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
        );
        let occ = resolve(&schedule, at(2026, 8, 29, 12, 0, 0)).unwrap();
        assert_eq!(occ.at, at(2026, 9, 3, 14, 30, 0));
        assert_eq!(occ.key, "2026-09-03");
        assert!(!occ.repeating);
    }

    #[test]
    fn one_off_without_date_is_unresolvable() {
        let schedule = Schedule::new("x", None, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert!(resolve(&schedule, at(2026, 8, 29, 12, 0, 0)).is_none());
    }

    #[test]
    fn weekly_skips_passed_day_and_picks_next_match() {
        // 2026-08-27 is a Thursday; Mon/Wed/Fri should resolve to Friday the
        // 28th, not the passed Wednesday.
        let schedule = weekly(vec![1, 3, 5], 9, 0);
        let occ = resolve(&schedule, at(2026, 8, 27, 12, 0, 0)).unwrap();
        assert_eq!(occ.at, at(2026, 8, 28, 9, 0, 0));
        assert_eq!(occ.key, "2026-08-28");
        assert!(occ.repeating);
    }

    #[test]
    fn same_day_earlier_time_rolls_to_next_week() {
        // Friday 10:00, schedule at 09:00 on Fridays only: next Friday.
        let schedule = weekly(vec![5], 9, 0);
        let occ = resolve(&schedule, at(2026, 8, 28, 10, 0, 0)).unwrap();
        assert_eq!(occ.at, at(2026, 9, 4, 9, 0, 0));
    }

    #[test]
    fn exact_match_is_selected_not_skipped() {
        let schedule = weekly(vec![5], 9, 0);
        let occ = resolve(&schedule, at(2026, 8, 28, 9, 0, 0)).unwrap();
        assert_eq!(occ.at, at(2026, 8, 28, 9, 0, 0));
    }

    #[test]
    fn seconds_within_the_minute_still_count_as_current() {
        // Reference is truncated to whole minutes before comparison.
        let schedule = weekly(vec![5], 9, 0);
        let occ = resolve(&schedule, at(2026, 8, 28, 9, 0, 42)).unwrap();
        assert_eq!(occ.at, at(2026, 8, 28, 9, 0, 0));
    }

    #[test]
    fn every_day_set_resolves_within_window() {
        let schedule = weekly(vec![0, 1, 2, 3, 4, 5, 6], 23, 59);
        let occ = resolve(&schedule, at(2026, 8, 29, 23, 59, 0)).unwrap();
        assert_eq!(occ.at, at(2026, 8, 29, 23, 59, 0));
    }

    #[test]
    fn minute_floor_drops_seconds() {
        assert_eq!(
            minute_floor(at(2026, 8, 29, 9, 5, 59)),
            at(2026, 8, 29, 9, 5, 0)
        );
    }
}
