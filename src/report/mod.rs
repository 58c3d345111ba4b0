//! CSV reports built from ExifTool results
//!
//! - `datetime`: four "taken" columns per file
//! - `tags`: one column per ExifTool tag, values shown or masked

pub mod datetime;
pub mod tags;

use crate::core::error::ExifToolError;
use crate::table::TableError;
use thiserror::Error;

pub use datetime::{DatetimeColumns, DatetimeReport};
pub use tags::{TagColumn, TagValueMode, TagsReport};

/// Errors building a report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    ExifTool(#[from] ExifToolError),

    #[error("Tried to create new columns, but already exist in the input CSV.: \"{}\"", .0.join("\", \""))]
    ColumnConflict(Vec<String>),

    #[error("{expected} input rows but {actual} results")]
    ResultCount { expected: usize, actual: usize },
}
