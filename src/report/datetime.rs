//! Report adding the "taken" timestamp of each file to the input table

use crate::datetime::projection::project;
use crate::datetime::resolver::{DatetimeCandidate, DatetimeResolver};
use crate::exiftool::binary::WorkerLauncher;
use crate::exiftool::progress::ProgressObserver;
use crate::exiftool::record::MetadataRecord;
use crate::exiftool::session::ExifToolSession;
use crate::report::ReportError;
use crate::table::{Table, TableError};
use chrono_tz::Tz;
use log::info;
use std::time::Duration;

/// Names of the four columns the report appends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatetimeColumns {
    /// Tag the timestamp was taken from
    pub tag: String,
    /// Tag value as reported by ExifTool
    pub raw: String,
    /// ISO 8601 extended, microsecond precision
    pub iso8601: String,
    /// Local wall clock as epoch seconds
    pub local_unix: String,
}

impl DatetimeColumns {
    pub fn names(&self) -> [&str; 4] {
        [
            self.tag.as_str(),
            self.raw.as_str(),
            self.iso8601.as_str(),
            self.local_unix.as_str(),
        ]
    }

    /// New column names that the table already has.
    pub fn existing_in(&self, table: &Table) -> Vec<String> {
        self.names()
            .into_iter()
            .filter(|name| table.has_column(name))
            .map(str::to_string)
            .collect()
    }
}

impl Default for DatetimeColumns {
    fn default() -> Self {
        Self {
            tag: "DATETIME_TAG_BY_EXIFTOOL".to_string(),
            raw: "DATETIME_BY_EXIFTOOL".to_string(),
            iso8601: "DATETIME_AWARE_ISO8601_EXTENDED".to_string(),
            local_unix: "DATETIME_LOCAL_UNIX".to_string(),
        }
    }
}

/// Resolves timestamps and writes them as table columns.
#[derive(Debug, Clone)]
pub struct DatetimeReport {
    resolver: DatetimeResolver,
    columns: DatetimeColumns,
    local_timezone: Tz,
}

impl DatetimeReport {
    pub fn new(resolver: DatetimeResolver, columns: DatetimeColumns, local_timezone: Tz) -> Self {
        Self {
            resolver,
            columns,
            local_timezone,
        }
    }

    pub fn resolver(&self) -> &DatetimeResolver {
        &self.resolver
    }

    pub fn columns(&self) -> &DatetimeColumns {
        &self.columns
    }

    /// Refuse tables that already contain one of the new columns.
    pub fn check_columns(&self, table: &Table) -> Result<(), ReportError> {
        let existing = self.columns.existing_in(table);
        if existing.is_empty() {
            Ok(())
        } else {
            Err(ReportError::ColumnConflict(existing))
        }
    }

    /// Resolve `results` (one per table row) and append the four columns.
    pub fn append(
        &self,
        table: &mut Table,
        results: &[Option<MetadataRecord>],
    ) -> Result<Vec<DatetimeCandidate>, ReportError> {
        if results.len() != table.len() {
            return Err(ReportError::ResultCount {
                expected: table.len(),
                actual: results.len(),
            });
        }
        self.check_columns(table)?;

        info!("Searching image taken datetime data...");
        let candidates = self.resolver.resolve(results);

        let rows: Vec<_> = candidates
            .iter()
            .map(|candidate| project(candidate, &self.local_timezone))
            .collect();

        info!("Adding new columns...");
        let mut tags = Vec::with_capacity(rows.len());
        let mut raws = Vec::with_capacity(rows.len());
        let mut isos = Vec::with_capacity(rows.len());
        let mut locals = Vec::with_capacity(rows.len());
        for row in rows {
            tags.push(row.tag);
            raws.push(row.raw);
            isos.push(row.iso8601);
            locals.push(row.local_unix);
        }

        table.push_column(&self.columns.tag, tags)?;
        table.push_column(&self.columns.raw, raws)?;
        table.push_column(&self.columns.iso8601, isos)?;
        table.push_column(&self.columns.local_unix, locals)?;

        Ok(candidates)
    }

    /// Run ExifTool on the paths in `path_column` and append the columns.
    ///
    /// Returns the number of files a timestamp was found for.
    pub fn run<L: WorkerLauncher>(
        &self,
        session: &mut ExifToolSession<L>,
        table: &mut Table,
        path_column: &str,
        progress_period: Option<Duration>,
        observer: &mut dyn ProgressObserver,
    ) -> Result<usize, ReportError> {
        self.check_columns(table)?;

        let paths: Vec<String> = table
            .column(path_column)
            .ok_or_else(|| TableError::MissingColumns(vec![path_column.to_string()]))?
            .into_iter()
            .map(str::to_string)
            .collect();

        info!("Scanning profiles of the files...");
        let results = session.execute_on_files_with(&paths, progress_period, observer)?;

        let candidates = self.append(table, &results)?;
        let found = candidates.iter().filter(|c| !c.is_empty()).count();
        info!("Found image taken datetime for {}/{} files", found, paths.len());
        Ok(found)
    }
}
