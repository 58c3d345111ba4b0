//! In-memory CSV table used by the reports
//!
//! Every cell is text. Input files are read whole, columns are appended, and
//! the result is written to a new file in one go. Existing output files are
//! never overwritten.

use encoding_rs::{Encoding, SHIFT_JIS, UTF_8};
use log::info;
use std::borrow::Cow;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// UTF-8 byte order mark written by some spreadsheet tools
const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Errors reading or writing tables
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Failed to read the CSV \"{}\": {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Necessary columns are missing in the CSV.: \"{}\"", .0.join("\", \""))]
    MissingColumns(Vec<String>),

    #[error("Empty rows in the CSV.")]
    Empty,

    #[error("Column already exists: \"{0}\"")]
    DuplicateColumn(String),

    #[error("Column \"{name}\" has {actual} values, but the table has {expected} rows")]
    ColumnLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Output file already exists: \"{}\"", .0.display())]
    OutputExists(PathBuf),

    #[error("Output directory does not exist: \"{}\"", .0.display())]
    OutputDirMissing(PathBuf),

    #[error("Failed to write the CSV \"{}\": {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to create \"{}\": {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unknown encoding: \"{0}\"")]
    UnknownEncoding(String),

    #[error("The CSV \"{}\" is not valid {encoding}", .path.display())]
    Decode { path: PathBuf, encoding: &'static str },

    #[error("Some values cannot be written as {encoding} to \"{}\"", .path.display())]
    Encode { path: PathBuf, encoding: &'static str },
}

/// Text encoding of a CSV file.
///
/// Labels follow the WHATWG encoding names (`utf-8`, `shift_jis`,
/// `euc-jp`, `windows-1252`, ...). `utf-8-sig` is UTF-8 written with a byte
/// order mark, and `cp932` is an alias of Shift_JIS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvEncoding {
    encoding: &'static Encoding,
    bom: bool,
}

impl Default for CsvEncoding {
    fn default() -> Self {
        Self::UTF_8
    }
}

impl CsvEncoding {
    pub const UTF_8: Self = Self {
        encoding: UTF_8,
        bom: false,
    };

    pub fn from_label(label: &str) -> Result<Self, TableError> {
        let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8-sig" | "utf8-sig" => {
                return Ok(Self {
                    encoding: UTF_8,
                    bom: true,
                })
            }
            "cp932" | "ms-932" => {
                return Ok(Self {
                    encoding: SHIFT_JIS,
                    bom: false,
                })
            }
            _ => {}
        }

        Encoding::for_label(normalized.as_bytes())
            .map(|encoding| Self {
                encoding,
                bom: false,
            })
            .ok_or_else(|| TableError::UnknownEncoding(label.to_string()))
    }

    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Whether text can be written in this encoding. UTF-16 and the
    /// replacement encoding are read-only.
    pub fn can_encode(&self) -> bool {
        self.encoding.output_encoding() == self.encoding
    }

    fn decode<'a>(&self, path: &Path, bytes: &'a [u8]) -> Result<Cow<'a, str>, TableError> {
        let (text, _, had_errors) = self.encoding.decode(bytes);
        if had_errors {
            return Err(TableError::Decode {
                path: path.to_path_buf(),
                encoding: self.name(),
            });
        }
        Ok(text)
    }

    fn encode(&self, path: &Path, text: &str) -> Result<Vec<u8>, TableError> {
        let encode_err = || TableError::Encode {
            path: path.to_path_buf(),
            encoding: self.name(),
        };
        if !self.can_encode() {
            return Err(encode_err());
        }

        let mut bytes = Vec::with_capacity(text.len() + UTF8_BOM.len());
        if self.bom {
            bytes.extend_from_slice(UTF8_BOM);
        }
        let (encoded, _, had_unmappable) = self.encoding.encode(text);
        if had_unmappable {
            return Err(encode_err());
        }
        bytes.extend_from_slice(&encoded);
        Ok(bytes)
    }
}

/// A header row plus text rows. Missing cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Read a UTF-8 CSV file. Empty cells are kept as empty strings.
    pub fn read_csv<P: AsRef<Path>>(
        path: P,
        required_columns: &[&str],
        allow_empty: bool,
    ) -> Result<Self, TableError> {
        Self::read_csv_encoded(path, CsvEncoding::UTF_8, required_columns, allow_empty)
    }

    /// Read a CSV file in the given encoding. A byte order mark, if any,
    /// takes precedence over the encoding and is dropped.
    pub fn read_csv_encoded<P: AsRef<Path>>(
        path: P,
        encoding: CsvEncoding,
        required_columns: &[&str],
        allow_empty: bool,
    ) -> Result<Self, TableError> {
        let path = path.as_ref();
        info!(
            "Reading CSV file \"{}\" ({})...",
            path.display(),
            encoding.name()
        );

        let read_err = |source: csv::Error| TableError::Read {
            path: path.to_path_buf(),
            source,
        };

        let bytes = fs::read(path).map_err(|e| read_err(e.into()))?;
        let text = encoding.decode(path, &bytes)?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(read_err)?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(read_err)?;
            let mut row: Vec<Option<String>> =
                record.iter().map(|cell| Some(cell.to_string())).collect();
            row.resize(headers.len(), None);
            rows.push(row);
        }

        let table = Self { headers, rows };

        let missing: Vec<String> = required_columns
            .iter()
            .filter(|name| table.column_index(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(TableError::MissingColumns(missing));
        }

        if !allow_empty && table.is_empty() {
            return Err(TableError::Empty);
        }

        Ok(table)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cells of one column, top to bottom. Missing cells read as "".
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(index).and_then(|c| c.as_deref()).unwrap_or(""))
                .collect(),
        )
    }

    /// Rename a column in place. Returns false if it does not exist.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(index) => {
                self.headers[index] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Append a column. There must be exactly one value per row.
    pub fn push_column(
        &mut self,
        name: &str,
        values: Vec<Option<String>>,
    ) -> Result<(), TableError> {
        if self.has_column(name) {
            return Err(TableError::DuplicateColumn(name.to_string()));
        }
        if values.len() != self.rows.len() {
            return Err(TableError::ColumnLength {
                name: name.to_string(),
                expected: self.rows.len(),
                actual: values.len(),
            });
        }

        self.headers.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<Option<String>>) {
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }

    /// Write UTF-8 to a file that must not exist yet, in a directory that must.
    pub fn write_csv_new<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        self.write_csv_new_encoded(path, CsvEncoding::UTF_8)
    }

    /// Write to a new file in the given encoding.
    ///
    /// Nothing is created when a value cannot be encoded.
    pub fn write_csv_new_encoded<P: AsRef<Path>>(
        &self,
        path: P,
        encoding: CsvEncoding,
    ) -> Result<(), TableError> {
        let path = path.as_ref();
        info!(
            "Writing CSV file \"{}\" ({})...",
            path.display(),
            encoding.name()
        );

        check_new_path(path)?;

        let write_err = |source: csv::Error| TableError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers).map_err(write_err)?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
                .map_err(write_err)?;
        }
        let utf8 = writer
            .into_inner()
            .map_err(|e| write_err(e.into_error().into()))?;
        let bytes = encoding.encode(path, &String::from_utf8_lossy(&utf8))?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|source| match source.kind() {
                io::ErrorKind::AlreadyExists => TableError::OutputExists(path.to_path_buf()),
                _ => TableError::Create {
                    path: path.to_path_buf(),
                    source,
                },
            })?;

        file.write_all(&bytes)
            .and_then(|_| file.flush())
            .map_err(|e| write_err(e.into()))?;
        Ok(())
    }
}

/// Fail unless `path` is free and its directory exists.
pub fn check_new_path(path: &Path) -> Result<(), TableError> {
    if path.exists() {
        return Err(TableError::OutputExists(path.to_path_buf()));
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(TableError::OutputDirMissing(parent.to_path_buf()));
    }
    Ok(())
}
