//! Weekday token vocabulary shared by the import adapters.
//!
//! CSV `repeat_days` columns and bulk-text repeat-specs resolve through the
//! same synonym table: full English names, three-letter abbreviations,
//! numerals 0–6 and Japanese day names are all accepted, plus the fixed
//! presets `weekdays` (Mon–Fri) and `daily` (all seven).

/// Parse one weekday token to its index (0 = Sunday).
pub fn parse_token(token: &str) -> Option<u8> {
    let token = token.trim().to_lowercase();
    if let Ok(day) = token.parse::<u8>() {
        return (day <= 6).then_some(day);
    }
    match token.as_str() {
        "sun" | "sunday" | "日" | "日曜" | "日曜日" => Some(0),
        "mon" | "monday" | "月" | "月曜" | "月曜日" => Some(1),
        "tue" | "tues" | "tuesday" | "火" | "火曜" | "火曜日" => Some(2),
        "wed" | "wednesday" | "水" | "水曜" | "水曜日" => Some(3),
        "thu" | "thur" | "thurs" | "thursday" | "木" | "木曜" | "木曜日" => Some(4),
        "fri" | "friday" | "金" | "金曜" | "金曜日" => Some(5),
        "sat" | "saturday" | "土" | "土曜" | "土曜日" => Some(6),
        _ => None,
    }
}

/// Parse a full repeat-spec: a preset, or a delimited list of day tokens.
///
/// Returns the sorted, deduplicated day set, or `None` when any token is
/// unrecognized or the spec is empty.
pub fn parse_spec(spec: &str) -> Option<Vec<u8>> {
    let spec = spec.trim();
    if spec.is_empty() {
        return None;
    }

    match spec.to_lowercase().as_str() {
        "weekdays" | "weekday" | "平日" => return Some(vec![1, 2, 3, 4, 5]),
        "daily" | "everyday" | "毎日" => return Some(vec![0, 1, 2, 3, 4, 5, 6]),
        _ => {}
    }

    let mut days = Vec::new();
    for token in spec.split(|c: char| c == ',' || c == '/' || c == '、' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        days.push(parse_token(token)?);
    }
    if days.is_empty() {
        return None;
    }
    days.sort_unstable();
    days.dedup();
    Some(days)
}
