//! ISO-8601 date handling
//!
//! Policy dates are stored as the strings clients send. They are only
//! parsed when two of them need to be compared, or when a key expiry is
//! checked against the clock.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Parse a calendar date (`2025-06-01`), a reduced-precision date
/// (`2025-06`, `2025`) or a date-time (`2025-06-01T10:00:00Z`,
/// `2025-06-01T10:00:00.000+02:00`, `2025-06-01T10:00`).
///
/// Date-only and offset-less values are read as UTC. Reduced-precision
/// dates start on the first day of their month or year.
pub fn parse_iso8601(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_year_month(s))
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// `YYYY` or `YYYY-MM`
fn parse_year_month(s: &str) -> Option<NaiveDate> {
    let all_digits =
        |part: &str, len: usize| part.len() == len && part.bytes().all(|b| b.is_ascii_digit());

    let (year, month) = match s.split_once('-') {
        Some((year, month)) if all_digits(month, 2) => (year, month.parse().ok()?),
        Some(_) => return None,
        None => (s, 1),
    };
    if !all_digits(year, 4) {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, 1)
}

/// Check that `end` falls strictly after `start`.
///
/// Unparseable input never satisfies the ordering.
pub fn is_strictly_after(start: &str, end: &str) -> bool {
    match (parse_iso8601(start), parse_iso8601(end)) {
        (Some(start), Some(end)) => end > start,
        _ => false,
    }
}

/// Current time as an RFC 3339 UTC timestamp with millisecond precision
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_date_only() {
        let dt = parse_iso8601("2025-06-01").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2025, 6, 1));
    }

    #[test]
    fn test_parse_reduced_precision() {
        let dt = parse_iso8601("2025-06").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2025, 6, 1));

        let dt = parse_iso8601("2025").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2025, 1, 1));

        assert!(parse_iso8601("2025-13").is_none());
        assert!(parse_iso8601("2025-6").is_none());
        assert!(parse_iso8601("25").is_none());
        assert!(parse_iso8601("20x5").is_none());
        assert!(is_strictly_after("2025", "2025-02"));
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let dt = parse_iso8601("2025-06-01T02:00:00+02:00").unwrap();
        assert_eq!(dt, parse_iso8601("2025-06-01T00:00:00Z").unwrap());
    }

    #[test]
    fn test_parse_naive_datetime() {
        assert!(parse_iso8601("2025-06-01T10:30:00").is_some());
        assert!(parse_iso8601("2025-06-01T10:30:00.250").is_some());
        assert!(parse_iso8601("2025-06-01T10:30").is_some());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_iso8601("").is_none());
        assert!(parse_iso8601("   ").is_none());
        assert!(parse_iso8601("not-a-date").is_none());
        assert!(parse_iso8601("2025-13-01").is_none());
        assert!(parse_iso8601("2025-02-30").is_none());
    }

    #[test]
    fn test_strictly_after() {
        assert!(is_strictly_after("2025-06-01", "2026-06-01"));
        assert!(!is_strictly_after("2025-06-01", "2025-06-01"));
        assert!(!is_strictly_after("2026-06-01", "2025-06-01"));
        assert!(!is_strictly_after("2025-06-01", "garbage"));
    }

    #[test]
    fn test_now_timestamp_round_trips() {
        let stamp = now_timestamp();
        assert!(stamp.ends_with('Z'));
        assert!(parse_iso8601(&stamp).is_some());
    }
}
