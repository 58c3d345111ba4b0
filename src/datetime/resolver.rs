//! Choosing one "taken" timestamp per file from a priority list of tags

use crate::datetime::parse::{into_aware, parse_exif_datetime};
use crate::exiftool::record::MetadataRecord;
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use log::{debug, trace};
use serde::Serialize;

/// The timestamp found for one file, and where it came from.
///
/// Either all three fields are set or none is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatetimeCandidate {
    /// Tag whose value was used
    pub matched_tag: Option<String>,
    /// Value of that tag exactly as ExifTool reported it
    pub raw_value: Option<String>,
    /// Parsed instant, with the default timezone applied to naive values
    pub resolved: Option<DateTime<FixedOffset>>,
}

impl DatetimeCandidate {
    /// Candidate for a file with no usable timestamp
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_none()
    }
}

/// Resolves records against a fixed tag priority and default timezone.
#[derive(Debug, Clone)]
pub struct DatetimeResolver {
    priority_tags: Vec<String>,
    default_timezone: Tz,
}

impl DatetimeResolver {
    pub fn new(priority_tags: Vec<String>, default_timezone: Tz) -> Self {
        Self {
            priority_tags,
            default_timezone,
        }
    }

    pub fn priority_tags(&self) -> &[String] {
        &self.priority_tags
    }

    pub fn default_timezone(&self) -> Tz {
        self.default_timezone
    }

    /// First tag in priority order whose value parses wins.
    pub fn resolve_record(&self, record: Option<&MetadataRecord>) -> DatetimeCandidate {
        let Some(record) = record else {
            return DatetimeCandidate::empty();
        };

        for tag in &self.priority_tags {
            let Some(raw_value) = record.value_text(tag) else {
                continue;
            };

            let resolved = parse_exif_datetime(&raw_value)
                .and_then(|parsed| into_aware(parsed, &self.default_timezone));

            match resolved {
                Some(resolved) => {
                    trace!("{}: {} -> {}", tag, raw_value, resolved);
                    return DatetimeCandidate {
                        matched_tag: Some(tag.clone()),
                        raw_value: Some(raw_value),
                        resolved: Some(resolved),
                    };
                }
                None => debug!("Failed to parse {} value as datetime: {:?}", tag, raw_value),
            }
        }

        DatetimeCandidate::empty()
    }

    /// One candidate per record, in order.
    pub fn resolve(&self, records: &[Option<MetadataRecord>]) -> Vec<DatetimeCandidate> {
        records
            .iter()
            .map(|record| self.resolve_record(record.as_ref()))
            .collect()
    }
}

/// Resolve `records` with a one-off resolver.
pub fn resolve(
    records: &[Option<MetadataRecord>],
    priority_tags: &[String],
    default_timezone: Tz,
) -> Vec<DatetimeCandidate> {
    DatetimeResolver::new(priority_tags.to_vec(), default_timezone).resolve(records)
}
