//! Report listing ExifTool tag values next to the input columns
//!
//! With target tags configured the values are shown as text. Without, every
//! tag ExifTool knows is extracted and the values are masked, so the report
//! only tells which tags each file has.

use crate::exiftool::binary::WorkerLauncher;
use crate::exiftool::progress::ProgressObserver;
use crate::exiftool::record::MetadataRecord;
use crate::exiftool::session::ExifToolSession;
use crate::report::ReportError;
use crate::table::{Table, TableError};
use log::{debug, info};
use std::collections::HashSet;
use std::time::Duration;

/// How tag values appear in the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValueMode {
    /// Values as text
    Specific,
    /// Every present value replaced by the masking string
    Masked(String),
}

impl TagValueMode {
    /// Specific mode when target tags are given, masked mode otherwise.
    pub fn for_targets(target_tags: &[String], masking_string: &str) -> Self {
        if target_tags.is_empty() {
            Self::Masked(masking_string.to_string())
        } else {
            Self::Specific
        }
    }

    fn cell(&self, record: &MetadataRecord, tag: &str) -> Option<String> {
        match self {
            Self::Specific => record.value_text(tag),
            Self::Masked(mask) => record.get(tag).map(|_| mask.clone()),
        }
    }
}

/// One tag column: name plus one cell per input row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagColumn {
    pub name: String,
    pub values: Vec<Option<String>>,
}

impl TagColumn {
    /// Number of rows with a value.
    pub fn filled(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

/// Build one column per tag seen in `results`, most filled first.
///
/// Columns with the same count keep the order they were first seen in.
/// `None` results leave their row empty in every column.
pub fn collect_tag_columns(results: &[Option<MetadataRecord>], mode: &TagValueMode) -> Vec<TagColumn> {
    let mut order: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for record in results.iter().flatten() {
        for tag in record.tag_names() {
            if seen.insert(tag) {
                order.push(tag);
            }
        }
    }

    let mut columns: Vec<TagColumn> = order
        .iter()
        .map(|tag| TagColumn {
            name: tag.to_string(),
            values: results
                .iter()
                .map(|record| record.as_ref().and_then(|r| mode.cell(r, tag)))
                .collect(),
        })
        .collect();

    // sort_by_key is stable
    columns.sort_by_key(|column| std::cmp::Reverse(column.filled()));
    columns
}

/// Merges tag columns into the input table.
#[derive(Debug, Clone)]
pub struct TagsReport {
    mode: TagValueMode,
    original_columns_suffix: String,
}

impl TagsReport {
    pub fn new(mode: TagValueMode, original_columns_suffix: impl Into<String>) -> Self {
        Self {
            mode,
            original_columns_suffix: original_columns_suffix.into(),
        }
    }

    pub fn mode(&self) -> &TagValueMode {
        &self.mode
    }

    /// Append one column per tag. Input columns named like a tag get the
    /// suffix; tag columns keep their names.
    ///
    /// Returns the number of tag columns added.
    pub fn merge(
        &self,
        table: &mut Table,
        results: &[Option<MetadataRecord>],
    ) -> Result<usize, ReportError> {
        if results.len() != table.len() {
            return Err(ReportError::ResultCount {
                expected: table.len(),
                actual: results.len(),
            });
        }

        info!("Merging profiles data to source CSV data...");
        let columns = collect_tag_columns(results, &self.mode);

        let mut conflicts = Vec::new();
        for column in &columns {
            if !table.has_column(&column.name) {
                continue;
            }
            let renamed = format!("{}{}", column.name, self.original_columns_suffix);
            if table.has_column(&renamed) || columns.iter().any(|c| c.name == renamed) {
                conflicts.push(renamed);
                continue;
            }
            debug!("Renaming input column {} to {}", column.name, renamed);
            table.rename_column(&column.name, &renamed);
        }
        if !conflicts.is_empty() {
            return Err(ReportError::ColumnConflict(conflicts));
        }

        let added = columns.len();
        for column in columns {
            table.push_column(&column.name, column.values)?;
        }
        Ok(added)
    }

    /// Run ExifTool on the paths in `path_column` and merge the tag columns.
    pub fn run<L: WorkerLauncher>(
        &self,
        session: &mut ExifToolSession<L>,
        table: &mut Table,
        path_column: &str,
        progress_period: Option<Duration>,
        observer: &mut dyn ProgressObserver,
    ) -> Result<usize, ReportError> {
        match self.mode {
            TagValueMode::Masked(_) => info!("Running in \"all tags mode\".: Masking all values."),
            TagValueMode::Specific => {
                info!("Running in \"specific tags mode\".: Showing all values.")
            }
        }

        let paths: Vec<String> = table
            .column(path_column)
            .ok_or_else(|| TableError::MissingColumns(vec![path_column.to_string()]))?
            .into_iter()
            .map(str::to_string)
            .collect();

        info!("Scanning profiles of the files...");
        let results = session.execute_on_files_with(&paths, progress_period, observer)?;

        self.merge(table, &results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Option<MetadataRecord> {
        Some(MetadataRecord::from_pairs(pairs.iter().copied()))
    }

    fn sample_results() -> Vec<Option<MetadataRecord>> {
        vec![
            record(&[("SourceFile", "/a.jpg"), ("EXIF:Make", "Canon")]),
            None,
            record(&[
                ("SourceFile", "/c.jpg"),
                ("EXIF:Model", "EOS"),
                ("EXIF:Make", "Nikon"),
            ]),
        ]
    }

    #[test]
    fn test_mode_for_targets() {
        assert_eq!(TagValueMode::for_targets(&[], "●"), TagValueMode::Masked("●".to_string()));
        assert_eq!(
            TagValueMode::for_targets(&["EXIF:Make".to_string()], "●"),
            TagValueMode::Specific
        );
    }

    #[test]
    fn test_columns_ordered_by_fill_count() {
        let columns = collect_tag_columns(&sample_results(), &TagValueMode::Specific);
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        // Make and SourceFile tie at 2 and keep first-seen order
        assert_eq!(names, vec!["EXIF:Make", "SourceFile", "EXIF:Model"]);

        assert_eq!(
            columns[0].values,
            vec![Some("Canon".to_string()), None, Some("Nikon".to_string())]
        );
        assert_eq!(columns[2].filled(), 1);
    }

    #[test]
    fn test_masked_values() {
        let mode = TagValueMode::Masked("●".to_string());
        let columns = collect_tag_columns(&sample_results(), &mode);
        let model = columns.iter().find(|c| c.name == "EXIF:Model").unwrap();
        assert_eq!(model.values, vec![None, None, Some("●".to_string())]);
    }

    #[test]
    fn test_merge_renames_colliding_input_columns() {
        let mut table = Table::new(vec!["path".to_string(), "SourceFile".to_string()]);
        for path in ["/a.jpg", "/b.jpg", "/c.jpg"] {
            table.push_row(vec![Some(path.to_string()), Some("input".to_string())]);
        }

        let report = TagsReport::new(TagValueMode::Specific, "_ORG");
        let added = report.merge(&mut table, &sample_results()).unwrap();

        assert_eq!(added, 3);
        assert_eq!(
            table.headers(),
            &[
                "path".to_string(),
                "SourceFile_ORG".to_string(),
                "EXIF:Make".to_string(),
                "SourceFile".to_string(),
                "EXIF:Model".to_string(),
            ]
        );
        assert_eq!(
            table.column("SourceFile_ORG").unwrap(),
            vec!["input", "input", "input"]
        );
        assert_eq!(table.column("SourceFile").unwrap(), vec!["/a.jpg", "", "/c.jpg"]);
    }

    #[test]
    fn test_merge_conflicting_suffix() {
        let mut table = Table::new(vec!["EXIF:Make".to_string(), "EXIF:Make_ORG".to_string()]);
        for _ in 0..3 {
            table.push_row(vec![None, None]);
        }

        let report = TagsReport::new(TagValueMode::Specific, "_ORG");
        let err = report.merge(&mut table, &sample_results()).unwrap_err();
        assert!(matches!(err, ReportError::ColumnConflict(ref cols) if cols == &["EXIF:Make_ORG"]));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_worker_masked() {
        use crate::exiftool::mock::ScriptedWorker;
        use crate::exiftool::progress::LogProgress;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let file = temp_dir.path().join("a.jpg");
        std::fs::File::create(&file).unwrap();

        let mut table = Table::new(vec!["path".to_string()]);
        table.push_row(vec![Some(file.to_string_lossy().to_string())]);

        let mut session =
            ExifToolSession::start(ScriptedWorker::echo("2022:01:02 03:04:05"), vec![]).unwrap();
        let report = TagsReport::new(TagValueMode::Masked("*".to_string()), "_ORG");
        let added = report
            .run(&mut session, &mut table, "path", None, &mut LogProgress)
            .unwrap();

        assert_eq!(added, 2);
        assert_eq!(table.column("EXIF:DateTimeOriginal").unwrap(), vec!["*"]);
        assert_eq!(table.column("SourceFile").unwrap(), vec!["*"]);
    }
}
