//! Bulk-text schedule entry.
//!
//! Each input line has the shape `H:MM title[| repeat-spec]`. The repeat
//! spec goes through the shared weekday synonym table; lines that fail to
//! parse are counted and reported, never fatal to the batch.

use crate::import::weekday;
use crate::schedule::model::{self, Schedule};
use chrono::{Local, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

/// `H:MM title` with optional surrounding whitespace; the repeat spec is
/// split off at the first `|` before this pattern applies.
fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(\d{1,2}:\d{1,2})\s+(\S.*?)\s*$").expect("bulk line pattern is valid")
    })
}

/// Outcome of a bulk-text batch.
#[derive(Debug, Default)]
pub struct BulkReport {
    /// Parsed, normalized schedules.
    pub schedules: Vec<Schedule>,
    /// One entry per skipped line, with the line number and reason.
    pub errors: Vec<String>,
}

/// Parse bulk-text input, anchoring one-off lines to today's date.
pub fn parse(input: &str) -> BulkReport {
    parse_with_date(input, Local::now().date_naive())
}

/// Parse bulk-text input with an explicit anchor date for one-off lines.
pub fn parse_with_date(input: &str, anchor: NaiveDate) -> BulkReport {
    let mut report = BulkReport::default();

    for (index, raw) in input.lines().enumerate() {
        let line = index + 1;
        if raw.trim().is_empty() {
            continue;
        }

        let (head, repeat_spec) = match raw.split_once('|') {
            Some((head, spec)) => (head, Some(spec)),
            None => (raw, None),
        };

        let Some(captures) = line_pattern().captures(head) else {
            report
                .errors
                .push(format!("line {line}: expected 'H:MM title'"));
            continue;
        };
        let Some(time) = model::parse_hhmm(&captures[1]) else {
            report
                .errors
                .push(format!("line {line}: invalid time '{}'", &captures[1]));
            continue;
        };
        let title = &captures[2];

        let days = match repeat_spec {
            Some(spec) => match weekday::parse_spec(spec) {
                Some(days) => Some(days),
                None => {
                    report.errors.push(format!(
                        "line {line}: unrecognized repeat spec '{}'",
                        spec.trim()
                    ));
                    continue;
                }
            },
            None => None,
        };

        let schedule = match days {
            // Repeating entries need no anchor; the rule carries the dates.
            Some(days) => Schedule::new(title, None, time).with_repeat(days),
            None => Schedule::new(title, Some(anchor), time),
        };
        report.schedules.push(schedule);
    }

    report
}
