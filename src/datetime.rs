//! Reference-zone time helpers shared by the form and the views.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

/// Zone every displayed or edited timestamp is expressed in.
pub const DEFAULT_TIME_ZONE: &str = "Asia/Jakarta";

/// Layout of an editable local timestamp field (`datetime-local`).
pub const EDITABLE_FORMAT: &str = "%Y-%m-%dT%H:%M";

pub fn parse_zone(name: &str) -> Result<Tz, String> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| format!("invalid time zone {name:?}: {e}"))
}

/// Render an instant for an editable field in the reference zone.
pub fn to_editable(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format(EDITABLE_FORMAT).to_string()
}

/// Convert an editable local timestamp into a normalized UTC string
/// (`2025-01-02T03:04:00.000Z`). Returns `None` for blank or unparseable input.
pub fn editable_to_utc(input: &str, tz: Tz) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(iso(with_offset.with_timezone(&Utc)));
    }
    let naive = NaiveDateTime::parse_from_str(trimmed, EDITABLE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
        .ok()?;
    let local = tz.from_local_datetime(&naive).earliest()?;
    Some(iso(local.with_timezone(&Utc)))
}

fn iso(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `2 Jan 2025, 10:04` in the reference zone.
pub fn format_date_time(instant: Option<DateTime<Utc>>, tz: Tz) -> String {
    match instant {
        Some(i) => i.with_timezone(&tz).format("%-d %b %Y, %H:%M").to_string(),
        None => "-".to_string(),
    }
}

/// `2 Jan 2025`.
pub fn format_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.format("%-d %b %Y").to_string(),
        None => "-".to_string(),
    }
}

/// `2 Jan 2025 (Thursday)`.
pub fn format_relative_due_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => format!("{} ({})", d.format("%-d %b %Y"), d.format("%A")),
        None => "-".to_string(),
    }
}
