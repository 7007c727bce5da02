//! Schedule definitions and normalization.
//!
//! Defines the persisted [`Schedule`] type, the [`Repeat`] rule, and the
//! [`NotifyStage`] state machine for the two notification checkpoints.
//! Persisted field names are camelCase so blobs written by the original
//! data format load unchanged.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Title substituted for schedules submitted with a blank title.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Notification progress for the occurrence currently being tracked.
///
/// Strictly monotonic within one occurrence; resets to [`Pending`] only when
/// the tracked occurrence key changes. Replaces the two boolean flags of the
/// legacy data format: old `preNotified`/`startNotified` fields are folded
/// into this enum on load (see [`Schedule::normalize`]).
///
/// [`Pending`]: NotifyStage::Pending
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum NotifyStage {
    /// Neither notification has fired for this occurrence.
    #[default]
    Pending,
    /// The lead warning fired.
    LeadFired,
    /// The start alert fired (terminal for this occurrence).
    StartFired,
}

/// Recurrence rule for a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Repeat {
    /// Fire every week on the given days (0 = Sunday .. 6 = Saturday).
    Weekly {
        /// Sorted, deduplicated weekday indices.
        days: Vec<u8>,
    },
}

/// A one-off or weekly-recurring schedule entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    /// Unique identifier, assigned from a monotonic clock at creation.
    pub id: u64,
    /// Display title; blank titles are normalized to [`DEFAULT_TITLE`].
    pub title: String,
    /// Anchor date; meaningful only for non-repeating schedules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Local wall-clock time shared by every occurrence.
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    /// Optional free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Recurrence rule; `None` for one-off schedules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<Repeat>,
    /// Pre-composed lead speech text; derived from the title when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_message: Option<String>,
    /// Pre-composed start speech text; derived from the title when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_message: Option<String>,
    /// `YYYY-MM-DD` key of the occurrence currently being tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_occurrence_key: Option<String>,
    /// Notification progress for the tracked occurrence.
    ///
    /// Valid only together with `last_occurrence_key`; the pair is always
    /// written as one unit via [`Schedule::reset_notification_state`] or the
    /// tracker's reconcile step.
    #[serde(default)]
    pub stage: NotifyStage,

    // Legacy input fields, accepted on deserialize only. The two booleans
    // are folded into `stage` by normalize(); the single pre-two-stage flag
    // is consumed once by the tracker, which needs the occurrence time to
    // decide which stage it implies.
    #[serde(default, skip_serializing)]
    pre_notified: Option<bool>,
    #[serde(default, skip_serializing)]
    start_notified: Option<bool>,
    #[serde(default, skip_serializing, rename = "notified")]
    pub(crate) legacy_notified: Option<bool>,
}

impl Schedule {
    /// Create a new schedule with a fresh id and cleared notification state.
    pub fn new(title: impl Into<String>, date: Option<NaiveDate>, time: NaiveTime) -> Self {
        let mut schedule = Self {
            id: next_id(),
            title: title.into(),
            date,
            time,
            description: None,
            repeat: None,
            lead_message: None,
            start_message: None,
            last_occurrence_key: None,
            stage: NotifyStage::Pending,
            pre_notified: None,
            start_notified: None,
            legacy_notified: None,
        };
        schedule.normalize();
        schedule
    }

    /// Set the recurrence rule (normalized).
    pub fn with_repeat(mut self, days: Vec<u8>) -> Self {
        self.repeat = Some(Repeat::Weekly { days });
        self.normalize();
        self
    }

    /// Enforce the schedule invariants in place.
    ///
    /// Blank titles fall back to [`DEFAULT_TITLE`]; repeat days are sorted,
    /// deduplicated and restricted to 0–6, with empty sets collapsing to no
    /// repeat; legacy two-boolean notification flags are folded into
    /// [`NotifyStage`]. Every externally-sourced schedule passes through
    /// here before it is accepted into the collection.
    pub fn normalize(&mut self) {
        let trimmed = self.title.trim().to_owned();
        self.title = if trimmed.is_empty() {
            DEFAULT_TITLE.to_owned()
        } else {
            trimmed
        };

        if let Some(Repeat::Weekly { days }) = &mut self.repeat {
            days.retain(|d| *d <= 6);
            days.sort_unstable();
            days.dedup();
            if days.is_empty() {
                self.repeat = None;
            }
        }

        // One-time upgrade from the two-boolean shape: only applies when the
        // blob carried no stage of its own.
        if self.stage == NotifyStage::Pending {
            if self.start_notified == Some(true) {
                self.stage = NotifyStage::StartFired;
            } else if self.pre_notified == Some(true) {
                self.stage = NotifyStage::LeadFired;
            }
        }
        self.pre_notified = None;
        self.start_notified = None;
    }

    /// Reset the tracked occurrence and both notification stages together.
    ///
    /// The key and stage form one atomic unit; this is the only way external
    /// code clears them. Called on every edit, because editing implies the
    /// occurrence contract may have changed.
    pub fn reset_notification_state(&mut self) {
        self.last_occurrence_key = None;
        self.stage = NotifyStage::Pending;
        self.legacy_notified = None;
    }

    /// Returns the weekly repeat days, or an empty slice for one-off entries.
    pub fn repeat_days(&self) -> &[u8] {
        match &self.repeat {
            Some(Repeat::Weekly { days }) => days,
            None => &[],
        }
    }

    /// Speech text for the lead warning.
    pub fn lead_text(&self, lead_minutes: i64) -> String {
        if let Some(message) = &self.lead_message {
            return message.clone();
        }
        match &self.repeat {
            Some(Repeat::Weekly { days }) => format!(
                "{}, every {}, starts in {} minutes, please prepare.",
                self.title,
                weekday_list(days),
                lead_minutes
            ),
            None => format!(
                "{} starts in {} minutes, please prepare.",
                self.title, lead_minutes
            ),
        }
    }

    /// Speech text for the start alert.
    pub fn start_text(&self) -> String {
        if let Some(message) = &self.start_message {
            return message.clone();
        }
        match &self.repeat {
            Some(Repeat::Weekly { days }) => format!(
                "{}, every {}, it is now time to begin.",
                self.title,
                weekday_list(days)
            ),
            None => format!("{}, it is now time to begin.", self.title),
        }
    }
}

/// Three-letter token for a weekday index (0 = Sunday).
pub fn weekday_short(day: u8) -> &'static str {
    match day {
        0 => "Sun",
        1 => "Mon",
        2 => "Tue",
        3 => "Wed",
        4 => "Thu",
        5 => "Fri",
        6 => "Sat",
        _ => "?",
    }
}

/// Human-readable weekday list, e.g. `"Mon/Wed/Fri"`.
pub fn weekday_list(days: &[u8]) -> String {
    days.iter()
        .map(|d| weekday_short(*d))
        .collect::<Vec<_>>()
        .join("/")
}

/// Parse `H:MM` / `HH:MM` 24-hour wall-clock time.
pub fn parse_hhmm(input: &str) -> Option<NaiveTime> {
    let (hour, minute) = input.trim().split_once(':')?;
    let hour: u32 = hour.trim().parse().ok()?;
    let minute: u32 = minute.trim().parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Next schedule id: epoch milliseconds, bumped past the previous id so that
/// two creations in the same millisecond stay distinct.
fn next_id() -> u64 {
    static LAST: AtomicU64 = AtomicU64::new(0);

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;

    let mut prev = LAST.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(prev + 1);
        match LAST.compare_exchange(prev, candidate, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return candidate,
            Err(actual) => prev = actual,
        }
    }
}

/// `HH:MM` serde representation for [`NaiveTime`].
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_hhmm(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid HH:MM time: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn nine_oclock() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 0, 0).unwrap()
    }

    #[test]
    fn new_schedule_has_cleared_state() {
        let schedule = Schedule::new("Standup", None, nine_oclock());
        assert!(schedule.id > 0);
        assert!(schedule.last_occurrence_key.is_none());
        assert_eq!(schedule.stage, NotifyStage::Pending);
    }

    #[test]
    fn ids_are_monotonic() {
        let a = Schedule::new("a", None, nine_oclock());
        let b = Schedule::new("b", None, nine_oclock());
        assert!(b.id > a.id);
    }

    #[test]
    fn blank_title_falls_back_to_default() {
        let schedule = Schedule::new("   ", None, nine_oclock());
        assert_eq!(schedule.title, DEFAULT_TITLE);
    }

    #[test]
    fn repeat_days_are_sorted_and_deduped() {
        let schedule = Schedule::new("gym", None, nine_oclock()).with_repeat(vec![5, 1, 3, 1, 9]);
        assert_eq!(schedule.repeat_days(), &[1, 3, 5]);
    }

    #[test]
    fn empty_repeat_days_collapse_to_no_repeat() {
        let schedule = Schedule::new("gym", None, nine_oclock()).with_repeat(vec![]);
        assert!(schedule.repeat.is_none());
        let schedule = Schedule::new("gym", None, nine_oclock()).with_repeat(vec![8, 200]);
        assert!(schedule.repeat.is_none());
    }

    #[test]
    fn stage_ordering_is_monotonic() {
        assert!(NotifyStage::Pending < NotifyStage::LeadFired);
        assert!(NotifyStage::LeadFired < NotifyStage::StartFired);
    }

    #[test]
    fn serde_uses_camel_case_and_hhmm() {
        let mut schedule = Schedule::new("Standup", None, nine_oclock());
        schedule.last_occurrence_key = Some("2026-08-31".to_owned());
        schedule.stage = NotifyStage::LeadFired;
        let json = serde_json::to_string(&schedule).unwrap();
        assert!(json.contains("\"lastOccurrenceKey\":\"2026-08-31\""));
        assert!(json.contains("\"time\":\"09:00\""));
        assert!(json.contains("\"stage\":\"lead_fired\""));

        let restored: Schedule = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.time, schedule.time);
        assert_eq!(restored.stage, NotifyStage::LeadFired);
    }

    #[test]
    fn legacy_two_boolean_shape_folds_into_stage() {
        let json = r#"{"id":1,"title":"old","time":"07:30","preNotified":true,"startNotified":false}"#;
        let mut restored: Schedule = serde_json::from_str(json).unwrap();
        restored.normalize();
        assert_eq!(restored.stage, NotifyStage::LeadFired);

        let json = r#"{"id":2,"title":"old","time":"07:30","preNotified":true,"startNotified":true}"#;
        let mut restored: Schedule = serde_json::from_str(json).unwrap();
        restored.normalize();
        assert_eq!(restored.stage, NotifyStage::StartFired);
    }

    #[test]
    fn legacy_single_flag_survives_for_tracker() {
        let json = r#"{"id":3,"title":"old","time":"07:30","notified":true}"#;
        let mut restored: Schedule = serde_json::from_str(json).unwrap();
        restored.normalize();
        assert_eq!(restored.stage, NotifyStage::Pending);
        assert_eq!(restored.legacy_notified, Some(true));
    }

    #[test]
    fn reset_clears_key_and_stage_together() {
        let mut schedule = Schedule::new("x", None, nine_oclock());
        schedule.last_occurrence_key = Some("2026-01-01".to_owned());
        schedule.stage = NotifyStage::StartFired;
        schedule.reset_notification_state();
        assert!(schedule.last_occurrence_key.is_none());
        assert_eq!(schedule.stage, NotifyStage::Pending);
    }

    #[test]
    fn parse_hhmm_accepts_unpadded_hours() {
        assert_eq!(parse_hhmm("9:05"), NaiveTime::from_hms_opt(9, 5, 0));
        assert_eq!(parse_hhmm("23:59"), NaiveTime::from_hms_opt(23, 59, 0));
        assert!(parse_hhmm("24:00").is_none());
        assert!(parse_hhmm("roar").is_none());
    }

    #[test]
    fn derived_messages_reference_title_and_days() {
        let schedule = Schedule::new("Standup", None, nine_oclock()).with_repeat(vec![1, 3, 5]);
        let lead = schedule.lead_text(5);
        assert!(lead.contains("Standup"));
        assert!(lead.contains("Mon/Wed/Fri"));
        assert!(lead.contains("5 minutes"));
        assert!(schedule.start_text().contains("time to begin"));
    }

    #[test]
    fn explicit_messages_win_over_derived() {
        let mut schedule = Schedule::new("Standup", None, nine_oclock());
        schedule.lead_message = Some("heads up".to_owned());
        schedule.start_message = Some("go".to_owned());
        assert_eq!(schedule.lead_text(5), "heads up");
        assert_eq!(schedule.start_text(), "go");
    }

    #[test]
    fn weekday_list_formats_slash_separated() {
        assert_eq!(weekday_list(&[1, 3, 5]), "Mon/Wed/Fri");
        assert_eq!(weekday_list(&[0]), "Sun");
        assert_eq!(weekday_list(&[]), "");
    }
}
