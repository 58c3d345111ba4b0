//! Text encodings of a resolved timestamp for the CSV report

use crate::datetime::resolver::DatetimeCandidate;
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;

const MICROS_PER_SECOND: u64 = 1_000_000;

/// ISO 8601 extended format with microseconds and offset,
/// e.g. `2022-01-02T03:04:05.000000+09:00`.
pub fn iso8601_extended(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6f%:z").to_string()
}

/// Seconds since the epoch of the wall clock in `local_tz`, read as if it
/// were UTC, with six decimals.
///
/// This is not a real Unix timestamp: 12:04:05 in Tokyo becomes the epoch
/// value of 12:04:05 UTC. Downstream tools use it as a sortable local time.
pub fn naive_local_epoch(dt: &DateTime<FixedOffset>, local_tz: &Tz) -> String {
    let micros = dt
        .with_timezone(local_tz)
        .naive_local()
        .and_utc()
        .timestamp_micros();

    let sign = if micros < 0 { "-" } else { "" };
    let magnitude = micros.unsigned_abs();
    format!(
        "{}{}.{:06}",
        sign,
        magnitude / MICROS_PER_SECOND,
        magnitude % MICROS_PER_SECOND
    )
}

/// Text cells written for one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectedRow {
    pub tag: Option<String>,
    pub raw: Option<String>,
    pub iso8601: Option<String>,
    pub local_unix: Option<String>,
}

/// Render a candidate into its report cells.
pub fn project(candidate: &DatetimeCandidate, local_tz: &Tz) -> ProjectedRow {
    ProjectedRow {
        tag: candidate.matched_tag.clone(),
        raw: candidate.raw_value.clone(),
        iso8601: candidate.resolved.as_ref().map(iso8601_extended),
        local_unix: candidate
            .resolved
            .as_ref()
            .map(|dt| naive_local_epoch(dt, local_tz)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(value).unwrap()
    }

    #[test]
    fn test_iso8601_extended() {
        assert_eq!(
            iso8601_extended(&parse("2022-01-02T03:04:05Z")),
            "2022-01-02T03:04:05.000000+00:00"
        );
        assert_eq!(
            iso8601_extended(&parse("2022-01-02T03:04:05.1234567-05:30")),
            "2022-01-02T03:04:05.123456-05:30"
        );
    }

    #[test]
    fn test_naive_local_epoch_tokyo() {
        let tokyo: Tz = "Asia/Tokyo".parse().unwrap();
        let dt = parse("2022-01-02T03:04:05+00:00");
        assert_eq!(dt.with_timezone(&tokyo).to_rfc3339(), "2022-01-02T12:04:05+09:00");
        assert_eq!(naive_local_epoch(&dt, &tokyo), "1641125045.000000");
    }

    #[test]
    fn test_naive_local_epoch_utc_matches_real_epoch() {
        let dt = parse("2022-01-02T03:04:05.5+00:00");
        assert_eq!(naive_local_epoch(&dt, &Tz::UTC), "1641092645.500000");
    }

    #[test]
    fn test_naive_local_epoch_before_1970() {
        let dt = parse("1969-12-31T23:59:59.250+00:00");
        assert_eq!(naive_local_epoch(&dt, &Tz::UTC), "-0.750000");
    }

    #[test]
    fn test_project_empty_candidate() {
        let row = project(&DatetimeCandidate::empty(), &Tz::UTC);
        assert_eq!(row, ProjectedRow::default());
    }

    #[test]
    fn test_project_resolved_candidate() {
        let candidate = DatetimeCandidate {
            matched_tag: Some("EXIF:DateTimeOriginal".to_string()),
            raw_value: Some("2022:01:02 03:04:05".to_string()),
            resolved: Some(parse("2022-01-02T03:04:05+00:00")),
        };
        let row = project(&candidate, &"Asia/Tokyo".parse().unwrap());

        assert_eq!(row.tag.as_deref(), Some("EXIF:DateTimeOriginal"));
        assert_eq!(row.raw.as_deref(), Some("2022:01:02 03:04:05"));
        assert_eq!(
            row.iso8601.as_deref(),
            Some("2022-01-02T03:04:05.000000+00:00")
        );
        assert_eq!(row.local_unix.as_deref(), Some("1641125045.000000"));
    }
}
