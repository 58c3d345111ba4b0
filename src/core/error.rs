//! Error types for the ExifTool worker and batch protocol
//!
//! Per-file absence and per-tag parse failures are not errors: they show up as
//! empty fields in the results. Everything here is either lifecycle misuse or a
//! process/protocol failure that aborts the whole batch.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Main error type for driving ExifTool
#[derive(Error, Debug)]
pub enum ExifToolError {
    /// The exiftool binary could not be located
    #[error("\"{program}\" is necessary, but not installed on this machine. See https://exiftool.org/index.html")]
    NotInstalled { program: String },

    /// `open()` was called on a session that is already open
    #[error("ExifTool session is already open")]
    AlreadyOpen,

    /// A batch was submitted to a session that is not open
    #[error("ExifTool session is not open")]
    NotOpen,

    /// The worker's stdin or stdout pipe is not connected
    #[error("No connection to the ExifTool stdin or stdout")]
    NoStreamConnection,

    /// Every path of the batch is missing
    #[error("All {count} file paths do not exist")]
    AllFilesMissing { count: usize },

    /// The output stream ended before the `{ready}` sentinel
    #[error("ExifTool process terminated or stdout closed unexpectedly")]
    WorkerTerminatedUnexpectedly,

    /// The accumulated response is not a JSON array of records
    #[error("ExifTool outputs a broken JSON: {0}")]
    MalformedOutput(#[source] serde_json::Error),

    /// No output line arrived within the configured read timeout
    #[error("No output from ExifTool for {:.1} seconds", .0.as_secs_f64())]
    ReadTimeout(Duration),

    /// A previous batch failed mid-protocol; the framing cannot be trusted
    #[error("ExifTool session is desynchronized after a previous failure; reopen it")]
    Desynchronized,

    /// The worker answered with a different number of records than paths sent
    #[error("ExifTool returned {actual} records for {expected} files")]
    RecordCountMismatch { expected: usize, actual: usize },

    /// Spawning the worker process failed
    #[error("Failed to start ExifTool: {0}")]
    SpawnFailed(#[source] io::Error),

    /// Writing a batch to the worker failed
    #[error("Failed to write to ExifTool: {0}")]
    WriteFailed(#[source] io::Error),

    /// Reading the worker output failed
    #[error("Failed to read from ExifTool: {0}")]
    ReadFailed(#[source] io::Error),
}

impl ExifToolError {
    /// Whether the session must be closed and reopened after this error.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Self::WorkerTerminatedUnexpectedly
                | Self::MalformedOutput(_)
                | Self::ReadTimeout(_)
                | Self::Desynchronized
                | Self::WriteFailed(_)
                | Self::ReadFailed(_)
        )
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ExifToolError>;
