//! Date and time utility functions
//!
//! The task provider speaks RFC 3339 everywhere. Due dates carry only a date
//! component on the provider side (the time part is always midnight UTC), so
//! comparisons between local and external due dates happen at day precision.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Standard date format used when comparing due dates.
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse an RFC 3339 timestamp into UTC.
///
/// Bare dates (`YYYY-MM-DD`) and naive datetimes are accepted and treated as
/// UTC. Anything else yields `None`; callers pick their own default.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }

    NaiveDate::parse_from_str(value, DUE_DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Format a timestamp the way the provider emits them (millisecond precision, `Z` suffix).
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Format a due date for the provider: the date at midnight UTC.
pub fn format_due(value: DateTime<Utc>) -> String {
    format_timestamp(truncate_to_day(value))
}

/// Drop the time-of-day component.
pub fn truncate_to_day(value: DateTime<Utc>) -> DateTime<Utc> {
    value
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(value)
}

/// Compare two optional due dates at day precision.
pub fn same_due_day(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.date_naive() == b.date_naive(),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T10:30:00.000Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T10:30:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-01"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp("  "), None);
    }

    #[test]
    fn test_format_due_truncates_time() {
        let value = Utc.with_ymd_and_hms(2024, 3, 1, 18, 45, 12).unwrap();
        assert_eq!(format_due(value), "2024-03-01T00:00:00.000Z");
    }

    #[test]
    fn test_same_due_day() {
        let morning = Utc.with_ymd_and_hms(2024, 3, 1, 1, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 3, 1, 23, 0, 0).unwrap();
        let next = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        assert!(same_due_day(Some(morning), Some(evening)));
        assert!(!same_due_day(Some(evening), Some(next)));
        assert!(!same_due_day(Some(evening), None));
        assert!(same_due_day(None, None));
    }
}
