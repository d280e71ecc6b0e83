//! Timestamp detection and normalisation for log lines.
//!
//! Detection decides block boundaries: a line with a detectable timestamp
//! starts a new entry, a line without one continues the previous entry.

use chrono::{Datelike, Local, NaiveDateTime, NaiveTime, Timelike};
use regex_lite::Regex;
use std::sync::OnceLock;

use crate::sanitize::sanitize;

static TIMESTAMP: OnceLock<Regex> = OnceLock::new();

/// Shared timestamp pattern. Alternatives, in order:
/// ISO-like `YYYY-MM-DD HH:MM:SS[,ffffff]`, syslog `Mon DD HH:MM:SS`,
/// bare `HH:MM:SS.fff`.
pub(crate) fn timestamp_regex() -> &'static Regex {
    TIMESTAMP.get_or_init(|| {
        Regex::new(
            r"(\d{2,4}[-/]\d{2}[-/]\d{2}[ T]\d{2}:\d{2}:\d{2}(?:,\d+)?)|(\w{3} \d{1,2} \d{2}:\d{2}:\d{2})|(\d{2}:\d{2}:\d{2}\.\d{3})",
        )
        .unwrap()
    })
}

/// Full-date templates tried in order against the raw substring
/// (fractional `,ffffff` already cut off).
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%dT%H:%M:%S",
];

/// Find the first timestamp substring in `line` (sanitized first).
pub fn detect_timestamp(line: &str) -> Option<String> {
    find_timestamp(&sanitize(line)).map(str::to_string)
}

/// Same as [`detect_timestamp`] for a line that is already sanitized.
pub(crate) fn find_timestamp(clean: &str) -> Option<&str> {
    timestamp_regex().find(clean).map(|m| m.as_str())
}

/// Parse a detected timestamp substring.
///
/// Syslog stamps carry no year and are placed in the current year; bare
/// clock times are placed on today's date.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    let head = raw.split(',').next().unwrap_or(raw);

    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(head, fmt) {
            return Some(ts);
        }
    }

    let today = Local::now().date_naive();
    let with_year = format!("{} {}", today.year(), head);
    if let Ok(ts) = NaiveDateTime::parse_from_str(&with_year, "%Y %b %d %H:%M:%S") {
        return Some(ts);
    }

    NaiveTime::parse_from_str(head, "%H:%M:%S%.f")
        .ok()
        .map(|t| today.and_time(t))
}

/// Normalise an optional raw timestamp into an ISO-8601 string.
///
/// Lossy: a missing substring, an unparsable substring and a genuine stamp
/// equal to the current time all produce "now". Callers that need to know
/// which happened must look at [`detect_timestamp`] / [`parse_timestamp`].
pub fn normalize_timestamp(raw: Option<&str>) -> String {
    let ts = raw
        .and_then(parse_timestamp)
        .unwrap_or_else(|| Local::now().naive_local());
    format_iso(ts)
}

fn format_iso(ts: NaiveDateTime) -> String {
    if ts.nanosecond() == 0 {
        ts.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_iso_timestamp() {
        let line = "2024-01-01 12:00:01 INFO next";
        assert_eq!(detect_timestamp(line).as_deref(), Some("2024-01-01 12:00:01"));
    }

    #[test]
    fn detects_iso_with_fraction() {
        let line = "[svc] 2024-03-05 08:15:30,123456 ERROR x";
        assert_eq!(
            detect_timestamp(line).as_deref(),
            Some("2024-03-05 08:15:30,123456")
        );
    }

    #[test]
    fn detects_syslog_timestamp() {
        let line = "Jan 5 10:11:12 host sshd[42]: error: bad key";
        assert_eq!(detect_timestamp(line).as_deref(), Some("Jan 5 10:11:12"));
    }

    #[test]
    fn detects_bare_clock_time() {
        let line = "10:11:12.345 worker FATAL oom";
        assert_eq!(detect_timestamp(line).as_deref(), Some("10:11:12.345"));
    }

    #[test]
    fn detects_through_ansi_codes() {
        let line = "\x1b[2m2024-01-01 10:00:00\x1b[0m ERROR boom";
        assert_eq!(detect_timestamp(line).as_deref(), Some("2024-01-01 10:00:00"));
    }

    #[test]
    fn stack_frame_has_no_timestamp() {
        assert_eq!(detect_timestamp("    at com.example.Main.run(Main.java:42)"), None);
        assert_eq!(detect_timestamp("ERROR boom"), None);
    }

    #[test]
    fn normalizes_iso() {
        assert_eq!(
            normalize_timestamp(Some("2024-01-01 12:00:01")),
            "2024-01-01T12:00:01"
        );
        assert_eq!(
            normalize_timestamp(Some("2024-01-01 12:00:01,999")),
            "2024-01-01T12:00:01"
        );
        assert_eq!(
            normalize_timestamp(Some("2024/01/01T12:00:01")),
            "2024-01-01T12:00:01"
        );
    }

    #[test]
    fn parses_syslog_into_current_year() {
        let ts = parse_timestamp("Mar 14 03:04:05").unwrap();
        assert_eq!(ts.year(), Local::now().year());
        assert_eq!(ts.month(), 3);
        assert_eq!(ts.day(), 14);
        assert_eq!(ts.hour(), 3);
    }

    #[test]
    fn parses_bare_time_with_millis() {
        let ts = parse_timestamp("10:11:12.345").unwrap();
        assert_eq!(ts.time().hour(), 10);
        assert_eq!(ts.time().nanosecond(), 345_000_000);
        assert!(normalize_timestamp(Some("10:11:12.345")).ends_with("T10:11:12.345000"));
    }

    #[test]
    fn missing_or_garbage_falls_back_to_now() {
        assert!(parse_timestamp("99-99-99 99:99:99").is_none());

        let before = Local::now().naive_local().with_nanosecond(0).unwrap();
        for raw in [None, Some("99-99-99 99:99:99")] {
            let out = normalize_timestamp(raw);
            let parsed = NaiveDateTime::parse_from_str(&out, "%Y-%m-%dT%H:%M:%S%.f").unwrap();
            assert!(parsed >= before, "{out} should be close to now");
        }
    }
}
