//! CSV export and import of the schedule set.
//!
//! One row per schedule with columns
//! `title,date,time,description,repeat_type,repeat_days`; standard CSV
//! quoting (fields containing a comma, quote or newline are wrapped in
//! double quotes with inner quotes doubled). Import is header-driven with
//! case-insensitive column lookup; malformed rows are collected as errors
//! and never abort the batch.

use crate::error::{EngineError, Result};
use crate::import::weekday;
use crate::schedule::model::{self, Repeat, Schedule};
use chrono::NaiveDate;

/// Export column order.
const COLUMNS: [&str; 6] = [
    "title",
    "date",
    "time",
    "description",
    "repeat_type",
    "repeat_days",
];

/// Outcome of an import batch: accepted schedules plus per-row errors.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Parsed, normalized schedules ready for the collection.
    pub schedules: Vec<Schedule>,
    /// One entry per skipped row, with the row number and reason.
    pub errors: Vec<String>,
}

/// Serialize schedules to CSV with a header row.
pub fn export(schedules: &[Schedule]) -> String {
    let mut out = COLUMNS.join(",");
    out.push('\n');

    for schedule in schedules {
        let date = schedule
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let repeat_type = match &schedule.repeat {
            Some(Repeat::Weekly { .. }) => "weekly",
            None => "",
        };
        let repeat_days = match &schedule.repeat {
            Some(Repeat::Weekly { days }) => days
                .iter()
                .map(|d| model::weekday_short(*d))
                .collect::<Vec<_>>()
                .join(","),
            None => String::new(),
        };

        let time = schedule.time.format("%H:%M").to_string();

        let fields = [
            schedule.title.as_str(),
            date.as_str(),
            time.as_str(),
            schedule.description.as_deref().unwrap_or_default(),
            repeat_type,
            repeat_days.as_str(),
        ];
        let row = fields.map(escape_field).join(",");
        out.push_str(&row);
        out.push('\n');
    }
    out
}

/// Parse CSV input into schedules.
///
/// Fails only when the header row is missing or lacks the required `title`
/// and `time` columns; row-level faults are accumulated in the report.
pub fn import(input: &str) -> Result<ImportReport> {
    let mut rows = parse_rows(input).into_iter();
    let header = rows
        .next()
        .ok_or_else(|| EngineError::Import("CSV input is empty, header row required".into()))?;
    let header: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();

    let column = |name: &str| header.iter().position(|h| h == name);
    let title_col = column("title")
        .ok_or_else(|| EngineError::Import("CSV header is missing the title column".into()))?;
    let time_col = column("time")
        .ok_or_else(|| EngineError::Import("CSV header is missing the time column".into()))?;
    let date_col = column("date");
    let description_col = column("description");
    let repeat_type_col = column("repeat_type");
    let repeat_days_col = column("repeat_days");

    let mut report = ImportReport::default();

    for (index, row) in rows.enumerate() {
        let line = index + 2; // 1-based, after the header
        if row.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let field = |col: Option<usize>| {
            col.and_then(|c| row.get(c))
                .map(|f| f.trim())
                .unwrap_or_default()
        };

        let title = field(Some(title_col));
        if title.is_empty() {
            report.errors.push(format!("row {line}: missing title"));
            continue;
        }
        let Some(time) = model::parse_hhmm(field(Some(time_col))) else {
            report
                .errors
                .push(format!("row {line}: missing or invalid time"));
            continue;
        };

        let date = match field(date_col) {
            "" => None,
            raw => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    report
                        .errors
                        .push(format!("row {line}: invalid date '{raw}'"));
                    continue;
                }
            },
        };

        let repeat = match field(repeat_type_col).to_lowercase().as_str() {
            "" | "none" => None,
            "weekly" => match weekday::parse_spec(field(repeat_days_col)) {
                Some(days) => Some(days),
                None => {
                    report
                        .errors
                        .push(format!("row {line}: unrecognized repeat days"));
                    continue;
                }
            },
            other => {
                report
                    .errors
                    .push(format!("row {line}: unknown repeat type '{other}'"));
                continue;
            }
        };

        let mut schedule = Schedule::new(title, date, time);
        if let Some(days) = repeat {
            schedule = schedule.with_repeat(days);
        }
        let description = field(description_col);
        if !description.is_empty() {
            schedule.description = Some(description.to_owned());
        }
        report.schedules.push(schedule);
    }

    Ok(report)
}

/// Quote a field when it contains a delimiter, quote or line break.
fn escape_field(field: &str) -> String {
    if field.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}

/// Split CSV text into rows of fields, honoring quoted fields (which may
/// contain delimiters, doubled quotes and line breaks).
fn parse_rows(input: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows.retain(|r| !(r.len() == 1 && r[0].is_empty()));
    rows
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use chrono::NaiveTime;

    fn schedule(title: &str) -> Schedule {
        Schedule::new(title, None, NaiveTime::from_hms_opt(9, 0, 0).unwrap())
    }

    #[test]
    fn export_writes_header_and_day_tokens() {
        let entry = schedule("Standup").with_repeat(vec![5, 1, 3]);
        let csv = export(std::slice::from_ref(&entry));
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "title,date,time,description,repeat_type,repeat_days"
        );
        assert_eq!(
            lines.next().unwrap(),
            "Standup,,09:00,,weekly,\"Mon,Wed,Fri\""
        );
    }

    #[test]
    fn fields_with_delimiters_are_quoted() {
        let mut entry = schedule("a,b");
        entry.description = Some("say \"hi\"\nthen go".to_owned());
        let csv = export(std::slice::from_ref(&entry));
        assert!(csv.contains("\"a,b\""));
        assert!(csv.contains("\"say \"\"hi\"\"\nthen go\""));
    }

    #[test]
    fn round_trip_preserves_repeat_set() {
        let entry = schedule("Standup").with_repeat(vec![1, 3, 5]);
        let report = import(&export(std::slice::from_ref(&entry))).unwrap();
        assert!(report.errors.is_empty());
        assert_eq!(report.schedules.len(), 1);
        assert_eq!(report.schedules[0].repeat_days(), &[1, 3, 5]);
        assert_eq!(report.schedules[0].time, entry.time);
    }

    #[test]
    fn round_trip_preserves_quoted_fields() {
        let mut entry = schedule("a,b");
        entry.description = Some("line one\nline \"two\"".to_owned());
        let report = import(&export(std::slice::from_ref(&entry))).unwrap();
        assert_eq!(report.schedules[0].title, "a,b");
        assert_eq!(
            report.schedules[0].description.as_deref(),
            Some("line one\nline \"two\"")
        );
    }

    #[test]
    fn header_lookup_is_case_insensitive_and_order_free() {
        let report = import("Time,TITLE\n09:30,Standup\n").unwrap();
        assert!(report.errors.is_empty());
        assert_eq!(report.schedules[0].title, "Standup");
        assert_eq!(
            report.schedules[0].time,
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
    }

    #[test]
    fn rows_missing_title_or_time_are_skipped_with_errors() {
        let input = "title,time\n,09:00\nStandup,\nOk,10:00\n";
        let report = import(input).unwrap();
        assert_eq!(report.schedules.len(), 1);
        assert_eq!(report.schedules[0].title, "Ok");
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].contains("row 2"));
        assert!(report.errors[1].contains("row 3"));
    }

    #[test]
    fn bad_date_and_bad_repeat_are_row_errors_not_fatal() {
        let input = "title,date,time,repeat_type,repeat_days\n\
                     a,not-a-date,09:00,,\n\
                     b,,09:00,weekly,blursday\n\
                     c,,09:00,hourly,\n\
                     d,2026-09-01,09:00,,\n";
        let report = import(input).unwrap();
        assert_eq!(report.schedules.len(), 1);
        assert_eq!(report.schedules[0].title, "d");
        assert_eq!(report.errors.len(), 3);
    }

    #[test]
    fn repeat_days_accept_synonym_vocabulary() {
        let input = "title,time,repeat_type,repeat_days\nj,09:00,weekly,\"月,水,金\"\n";
        let report = import(input).unwrap();
        assert_eq!(report.schedules[0].repeat_days(), &[1, 3, 5]);
    }

    #[test]
    fn missing_header_is_an_error() {
        assert!(import("").is_err());
        assert!(import("name,when\nx,09:00\n").is_err());
    }
}
