//! Turning ExifTool tag values into timezone-aware "taken" timestamps

pub mod parse;
pub mod projection;
pub mod resolver;

pub use parse::{normalize_exif_date, parse_flexible, ParsedDatetime};
pub use projection::{iso8601_extended, naive_local_epoch, project, ProjectedRow};
pub use resolver::{resolve, DatetimeCandidate, DatetimeResolver};
