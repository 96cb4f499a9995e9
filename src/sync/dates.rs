//! Date parsing for filenames and stored column values
//!
//! Archive producers embed dates in filenames in several layouts, e.g.
//! `PlantwareP3 2025-10-04 11;33;53.zip` or `staging_20251004.zip`.

use std::sync::OnceLock;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;

/// Filename patterns in priority order
fn filename_patterns() -> &'static [(Regex, FilenameLayout)] {
    static PATTERNS: OnceLock<Vec<(Regex, FilenameLayout)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            (
                Regex::new(r"(\d{4})-(\d{2})-(\d{2})\s+(\d{2});(\d{2});(\d{2})").expect("Invalid datetime regex"),
                FilenameLayout::YmdHms,
            ),
            (Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("Invalid date regex"), FilenameLayout::Ymd),
            (Regex::new(r"(\d{4})_(\d{2})_(\d{2})").expect("Invalid date regex"), FilenameLayout::Ymd),
            (Regex::new(r"(\d{2})-(\d{2})-(\d{4})").expect("Invalid date regex"), FilenameLayout::Dmy),
            (
                Regex::new(r"(?:^|\D)(\d{4})(\d{2})(\d{2})(?:\D|$)").expect("Invalid compact date regex"),
                FilenameLayout::Ymd,
            ),
        ]
    })
}

#[derive(Debug, Clone, Copy)]
enum FilenameLayout {
    YmdHms,
    Ymd,
    Dmy,
}

fn num(caps: &regex::Captures<'_>, index: usize) -> Option<u32> {
    caps.get(index)?.as_str().parse().ok()
}

fn build(caps: &regex::Captures<'_>, layout: FilenameLayout) -> Option<NaiveDateTime> {
    let (year, month, day) = match layout {
        FilenameLayout::YmdHms | FilenameLayout::Ymd => (num(caps, 1)?, num(caps, 2)?, num(caps, 3)?),
        FilenameLayout::Dmy => (num(caps, 3)?, num(caps, 2)?, num(caps, 1)?),
    };
    let date = NaiveDate::from_ymd_opt(year as i32, month, day)?;
    let time = match layout {
        FilenameLayout::YmdHms => NaiveTime::from_hms_opt(num(caps, 4)?, num(caps, 5)?, num(caps, 6)?)?,
        _ => NaiveTime::MIN,
    };
    Some(date.and_time(time))
}

/// Extract the backup date embedded in a filename
///
/// The first pattern yielding a valid calendar date wins; date-only matches
/// resolve to midnight.
pub fn date_from_filename(file_name: &str) -> Option<NaiveDateTime> {
    filename_patterns().iter().find_map(|(regex, layout)| {
        regex
            .captures_iter(file_name)
            .find_map(|caps| build(&caps, *layout))
    })
}

/// Text layouts accepted for stored date/time values
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y%m%d%H%M%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%Y%m%d"];

/// Parse a stored text value as a date/time
pub fn parse_datetime_text(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// An instant as local wall-clock time, the basis of every other date here
pub fn local_from_utc(instant: DateTime<Utc>) -> NaiveDateTime {
    instant.with_timezone(&Local).naive_local()
}

/// Interpret an integer as Unix seconds, or milliseconds when too large
pub fn from_unix_integer(value: i64) -> Option<NaiveDateTime> {
    const MILLIS_CUTOFF: i64 = 100_000_000_000;
    let dt = if value.abs() >= MILLIS_CUTOFF {
        DateTime::from_timestamp_millis(value)?
    } else {
        DateTime::from_timestamp(value, 0)?
    };
    Some(local_from_utc(dt))
}

/// Interpret a real as a Julian day number (SQLite `julianday()`)
pub fn from_julian_day(value: f64) -> Option<NaiveDateTime> {
    const UNIX_EPOCH_JD: f64 = 2_440_587.5;
    if !value.is_finite() {
        return None;
    }
    let millis = ((value - UNIX_EPOCH_JD) * 86_400_000.0).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64).map(local_from_utc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_filename_with_time() {
        assert_eq!(
            date_from_filename("PlantwareP3 2025-10-04 11;33;53.zip"),
            Some(dt("2025-10-04 11:33:53"))
        );
    }

    #[test]
    fn test_filename_layouts() {
        assert_eq!(date_from_filename("staging_2025-10-04.zip"), Some(dt("2025-10-04 00:00:00")));
        assert_eq!(date_from_filename("venus_2025_10_04.zip"), Some(dt("2025-10-04 00:00:00")));
        assert_eq!(date_from_filename("venus 04-10-2025.zip"), Some(dt("2025-10-04 00:00:00")));
        assert_eq!(date_from_filename("BackupStaging20251004.zip"), Some(dt("2025-10-04 00:00:00")));
    }

    #[test]
    fn test_filename_invalid_dates_skipped() {
        assert_eq!(date_from_filename("backup_2025-13-40.zip"), None);
        assert_eq!(date_from_filename("backup.zip"), None);
        assert_eq!(date_from_filename("id123456789.zip"), None);
    }

    #[test]
    fn test_parse_text_values() {
        assert_eq!(parse_datetime_text("2025-10-04 11:00:00"), Some(dt("2025-10-04 11:00:00")));
        assert_eq!(parse_datetime_text("2025-10-04 11:00:00.123").map(|d| d.date()), Some(dt("2025-10-04 00:00:00").date()));
        assert_eq!(parse_datetime_text("2025-10-04T11:00:00"), Some(dt("2025-10-04 11:00:00")));
        assert_eq!(parse_datetime_text("2025-10-04"), Some(dt("2025-10-04 00:00:00")));
        assert_eq!(parse_datetime_text("2025-10-04T11:00:00+07:00"), Some(dt("2025-10-04 11:00:00")));
        assert_eq!(parse_datetime_text("not a date"), None);
        assert_eq!(parse_datetime_text("   "), None);
    }

    #[test]
    fn test_numeric_values() {
        let expected = local_from_utc(DateTime::from_timestamp(1_759_575_600, 0).unwrap());
        assert_eq!(from_unix_integer(1_759_575_600), Some(expected));
        assert_eq!(from_unix_integer(1_759_575_600_000), Some(expected));
        assert_eq!(
            from_julian_day(2_440_587.5),
            Some(local_from_utc(DateTime::from_timestamp(0, 0).unwrap()))
        );
        assert_eq!(from_julian_day(f64::NAN), None);
    }

    #[test]
    fn test_epoch_values_share_the_local_clock() {
        use crate::sync::{Clock, SystemClock};

        let before = SystemClock.now();
        let decoded = from_unix_integer(Utc::now().timestamp()).unwrap();
        let after = SystemClock.now();
        // Whole seconds only, so allow the truncated fraction
        assert!(decoded >= before - chrono::Duration::seconds(1));
        assert!(decoded <= after);

        let hour_ago = from_unix_integer(Utc::now().timestamp() - 3600).unwrap();
        let age = SystemClock.now() - hour_ago;
        assert!(age >= chrono::Duration::minutes(59) && age <= chrono::Duration::minutes(61));
    }
}
