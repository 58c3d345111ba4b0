//! Lenient parsing of date strings as written by ExifTool and friends
//!
//! ExifTool writes dates as `YYYY:MM:DD HH:MM:SS` with optional sub-seconds
//! and offset. Other groups (XMP, QuickTime, file system) use ISO-like or
//! RFC forms. Everything is first normalized to dashes, then tried against a
//! fixed list of layouts.

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone,
};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

static EXIF_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4}):(\d{2}):(\d{2})").expect("Invalid EXIF date regex")
});

/// A trailing offset is only recognised after a time of day, so the day
/// field of a bare date is never mistaken for one.
static TRAILING_OFFSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<naive>.*\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?)\s*(?P<offset>[Zz]|(?i:UTC|GMT)|[+-]\d{2}(?::?\d{2})?)$",
    )
    .expect("Invalid offset regex")
});

const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%Y/%m/%dT%H:%M",
];

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Result of parsing one date string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDatetime {
    /// The string carried its own offset
    Aware(DateTime<FixedOffset>),
    /// Wall clock only
    Naive(NaiveDateTime),
}

/// Rewrite every `YYYY:MM:DD` occurrence as `YYYY-MM-DD`.
pub fn normalize_exif_date(value: &str) -> String {
    EXIF_DATE.replace_all(value, "$1-$2-$3").into_owned()
}

/// Parse an already normalized date string.
pub fn parse_flexible(value: &str) -> Option<ParsedDatetime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(ParsedDatetime::Aware(dt));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(ParsedDatetime::Aware(dt));
    }

    if let Some(caps) = TRAILING_OFFSET.captures(value) {
        let offset = parse_offset(&caps["offset"])?;
        let naive = parse_naive(caps["naive"].trim_end())?;
        return offset
            .from_local_datetime(&naive)
            .single()
            .map(ParsedDatetime::Aware);
    }

    parse_naive(value).map(ParsedDatetime::Naive)
}

/// Normalize and parse in one step.
pub fn parse_exif_datetime(value: &str) -> Option<ParsedDatetime> {
    parse_flexible(&normalize_exif_date(value))
}

fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    DATETIME_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(value, layout).ok())
        .or_else(|| {
            DATE_LAYOUTS
                .iter()
                .find_map(|layout| NaiveDate::parse_from_str(value, layout).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn parse_offset(text: &str) -> Option<FixedOffset> {
    if ["z", "utc", "gmt"]
        .iter()
        .any(|name| text.eq_ignore_ascii_case(name))
    {
        return FixedOffset::east_opt(0);
    }

    let sign = if text.starts_with('-') { -1 } else { 1 };
    let digits: String = text[1..].chars().filter(|c| *c != ':').collect();
    let (hours, minutes) = match digits.len() {
        2 => (digits.as_str(), "00"),
        4 => digits.split_at(2),
        _ => return None,
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Interpret a wall clock time in `tz`.
///
/// Ambiguous times (clocks turned back) take the earlier offset. Times that
/// fall in a gap (clocks turned forward) keep their wall clock and get the
/// offset in force before the transition.
pub fn attach_default_timezone(naive: NaiveDateTime, tz: &Tz) -> Option<DateTime<FixedOffset>> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return Some(dt.fixed_offset());
    }

    // Walk back to the last valid wall clock before the gap
    let offset = (1..=48)
        .map(|steps| naive - Duration::minutes(30 * steps))
        .find_map(|earlier| tz.from_local_datetime(&earlier).earliest())
        .map(|dt| dt.offset().fix())?;
    offset.from_local_datetime(&naive).single()
}

/// Resolve a parsed value to an aware instant, using `tz` for naive values.
pub fn into_aware(parsed: ParsedDatetime, tz: &Tz) -> Option<DateTime<FixedOffset>> {
    match parsed {
        ParsedDatetime::Aware(dt) => Some(dt),
        ParsedDatetime::Naive(naive) => attach_default_timezone(naive, tz),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn aware(value: &str) -> DateTime<FixedOffset> {
        match parse_exif_datetime(value) {
            Some(ParsedDatetime::Aware(dt)) => dt,
            other => panic!("expected aware datetime for {:?}, got {:?}", value, other),
        }
    }

    fn naive(value: &str) -> NaiveDateTime {
        match parse_exif_datetime(value) {
            Some(ParsedDatetime::Naive(dt)) => dt,
            other => panic!("expected naive datetime for {:?}, got {:?}", value, other),
        }
    }

    #[test]
    fn test_normalize_exif_date() {
        assert_eq!(
            normalize_exif_date("2022:01:02 03:04:05"),
            "2022-01-02 03:04:05"
        );
        // Times are left alone
        assert_eq!(normalize_exif_date("03:04:05"), "03:04:05");
        assert_eq!(
            normalize_exif_date("2022:01:02 to 2023:04:05"),
            "2022-01-02 to 2023-04-05"
        );
    }

    #[test]
    fn test_exif_layout_is_naive() {
        let dt = naive("2022:01:02 03:04:05");
        assert_eq!((dt.year(), dt.month(), dt.day()), (2022, 1, 2));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (3, 4, 5));
    }

    #[test]
    fn test_sub_seconds() {
        let dt = naive("2022:01:02 03:04:05.250");
        assert_eq!(dt.nanosecond(), 250_000_000);
    }

    #[test]
    fn test_trailing_offsets() {
        for value in [
            "2022:01:02 03:04:05+09:00",
            "2022:01:02 03:04:05 +09:00",
            "2022:01:02 03:04:05+0900",
            "2022:01:02 03:04:05+09",
            "2022:01:02 03:04:05 +09",
            "2022-01-02T03:04:05.000+09:00",
        ] {
            let dt = aware(value);
            assert_eq!(dt.offset().local_minus_utc(), 9 * 3600, "{}", value);
            assert_eq!(dt.hour(), 3, "{}", value);
        }

        assert_eq!(aware("2022:01:02 03:04:05Z").offset().local_minus_utc(), 0);
        for value in ["2022:01:02 03:04:05 UTC", "2022:01:02 03:04:05 GMT", "2022-01-02 03:04utc"] {
            let dt = aware(value);
            assert_eq!(dt.offset().local_minus_utc(), 0, "{}", value);
            assert_eq!(dt.hour(), 3, "{}", value);
        }
        assert_eq!(
            aware("2022:01:02 03:04:05-03").offset().local_minus_utc(),
            -3 * 3600
        );
        // Offsets of odd width are not guessed at
        assert!(parse_exif_datetime("2022:01:02 03:04:05+090").is_none());
        assert_eq!(
            aware("2022:01:02 03:04-05:30").offset().local_minus_utc(),
            -(5 * 3600 + 30 * 60)
        );
    }

    #[test]
    fn test_rfc_forms() {
        assert_eq!(aware("2022-01-02T03:04:05+01:00").hour(), 3);
        let dt = aware("Sun, 02 Jan 2022 03:04:05 +0000");
        assert_eq!((dt.day(), dt.hour()), (2, 3));
    }

    #[test]
    fn test_slash_and_date_only_layouts() {
        assert_eq!(naive("2022/01/02 03:04").minute(), 4);
        let midnight = naive("2022:01:02");
        assert_eq!((midnight.day(), midnight.hour()), (2, 0));
        assert_eq!(naive("2022/01/02").day(), 2);
    }

    #[test]
    fn test_unparseable_values() {
        assert!(parse_exif_datetime("").is_none());
        assert!(parse_exif_datetime("   ").is_none());
        assert!(parse_exif_datetime("not a date").is_none());
        assert!(parse_exif_datetime("0000:00:00 00:00:00").is_none());
        assert!(parse_exif_datetime("2022:13:40 03:04:05").is_none());
    }

    #[test]
    fn test_attach_default_timezone() {
        let wall = NaiveDate::from_ymd_opt(2022, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let dt = attach_default_timezone(wall, &chrono_tz::Asia::Tokyo).unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 9 * 3600);
        assert_eq!(dt.naive_local(), wall);
    }

    #[test]
    fn test_ambiguous_time_takes_earlier_offset() {
        // Clocks go back from 02:00 EDT to 01:00 EST on 2022-11-06
        let wall = NaiveDate::from_ymd_opt(2022, 11, 6)
            .unwrap()
            .and_hms_opt(1, 30, 0)
            .unwrap();
        let dt = attach_default_timezone(wall, &chrono_tz::America::New_York).unwrap();
        assert_eq!(dt.offset().local_minus_utc(), -4 * 3600);
    }

    #[test]
    fn test_gap_time_keeps_wall_clock() {
        // 02:30 does not exist on 2022-03-13 in New York
        let wall = NaiveDate::from_ymd_opt(2022, 3, 13)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        let dt = attach_default_timezone(wall, &chrono_tz::America::New_York).unwrap();
        assert_eq!(dt.naive_local(), wall);
        assert_eq!(dt.offset().local_minus_utc(), -5 * 3600);
    }
}
