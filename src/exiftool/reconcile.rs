//! Existence mask and re-expansion of worker results.
//!
//! ExifTool only ever sees the paths that exist. The mask remembers which
//! positions were sent so the reply can be stretched back to the caller's
//! order and length.

use crate::core::error::{ExifToolError, Result};
use crate::exiftool::record::MetadataRecord;
use log::warn;
use std::path::Path;

/// One entry per input path: a record, or `None` for files never sent.
pub type ReconciledResult = Vec<Option<MetadataRecord>>;

/// Which input paths are submitted to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistenceMask {
    present: Vec<bool>,
}

impl ExistenceMask {
    /// Check every path on disk, warning about each one that is missing.
    ///
    /// A path containing a line break is also left out: the worker reads one
    /// argument per line and would split it.
    pub fn compute<P: AsRef<str>>(paths: &[P]) -> Self {
        let present = paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                if path.contains(['\n', '\r']) {
                    warn!("File path contains a line break, skipped.: {:?}", path);
                    false
                } else if Path::new(path).exists() {
                    true
                } else {
                    warn!("File not found.: \"{}\"", path);
                    false
                }
            })
            .collect();
        Self { present }
    }

    pub fn from_flags(present: Vec<bool>) -> Self {
        Self { present }
    }

    pub fn len(&self) -> usize {
        self.present.len()
    }

    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }

    /// Number of paths that will be sent.
    pub fn present_count(&self) -> usize {
        self.present.iter().filter(|p| **p).count()
    }

    pub fn is_present(&self, index: usize) -> bool {
        self.present.get(index).copied().unwrap_or(false)
    }

    pub fn flags(&self) -> &[bool] {
        &self.present
    }

    /// The paths to send, in input order.
    pub fn select<'a, P: AsRef<str>>(&self, paths: &'a [P]) -> Vec<&'a str> {
        paths
            .iter()
            .zip(&self.present)
            .filter(|(_, present)| **present)
            .map(|(path, _)| path.as_ref())
            .collect()
    }
}

/// Re-expand worker records to the full input length.
///
/// `records` must hold exactly one entry per present position, in the order
/// the paths were sent.
pub fn reconcile(mask: &ExistenceMask, records: Vec<MetadataRecord>) -> Result<ReconciledResult> {
    let expected = mask.present_count();
    if records.len() != expected {
        return Err(ExifToolError::RecordCountMismatch {
            expected,
            actual: records.len(),
        });
    }

    let mut records = records.into_iter();
    Ok(mask
        .flags()
        .iter()
        .map(|present| if *present { records.next() } else { None })
        .collect())
}
