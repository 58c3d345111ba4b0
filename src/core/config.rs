//! Configuration module for image_taken_datetime
//!
//! Supports loading configuration from a TOML file.
//! Configuration is stored in a standard location:
//! - Windows: %APPDATA%\image_taken_datetime\config.toml
//! - Linux: ~/.config/image_taken_datetime/config.toml
//! - macOS: ~/Library/Application Support/image_taken_datetime/config.toml

use crate::report::DatetimeColumns;
use crate::table::CsvEncoding;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application name used for config directory
const APP_NAME: &str = "image_taken_datetime";

/// Default config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config files checked in the working directory, in order
const LOCAL_CONFIG_PATHS: [&str; 2] = ["./config.toml", "./image_taken_datetime.toml"];

/// Encoding of the CSV files unless configured
const DEFAULT_ENCODING: &str = "utf-8";

/// Accepted values for `logging.level`
const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Get the standard configuration directory for the application.
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME))
}

/// Get the standard configuration file path.
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// ExifTool settings
    pub exiftool: ExifToolConfig,

    /// Input CSV settings
    pub input: InputConfig,

    /// Processing settings
    pub process: ProcessConfig,

    /// Output CSV settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// ExifTool configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExifToolConfig {
    /// Path to the exiftool executable (empty = search PATH)
    pub path: Option<PathBuf>,

    /// Give up when ExifTool prints nothing for this many seconds (empty = wait forever)
    pub read_timeout_secs: Option<f64>,
}

/// Input CSV configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// CSV file listing the media files
    pub csv_path: PathBuf,

    /// Column holding the file paths
    pub path_column: String,

    /// Text encoding of the CSV
    pub encoding: String,
}

/// Processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// IANA timezone applied to datetime values without offset
    pub default_timezone: String,

    /// Seconds between progress reports (empty or 0 = no reports)
    pub progress_period_secs: Option<f64>,

    /// Tags searched for the taken datetime, highest priority first
    pub datetime_tags: Vec<String>,

    /// Tags listed by the `tags` command (empty = all tags, values masked)
    pub target_tags: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output of the `datetime` command
    pub datetime_csv: DatetimeCsvConfig,

    /// Output of the `tags` command
    pub tags_csv: TagsCsvConfig,
}

/// Datetime report configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatetimeCsvConfig {
    /// New CSV file to write (must not exist)
    pub path: PathBuf,

    /// IANA timezone of the local unix timestamp column
    pub local_timezone: String,

    /// Column name for the matched tag
    pub tag_column: String,

    /// Column name for the raw tag value
    pub raw_column: String,

    /// Column name for the ISO 8601 datetime
    pub iso8601_column: String,

    /// Column name for the local unix timestamp
    pub local_unix_column: String,

    /// Text encoding of the CSV
    pub encoding: String,
}

/// Tags report configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TagsCsvConfig {
    /// New CSV file to write (must not exist)
    pub path: PathBuf,

    /// Replaces every value in all tags mode
    pub masking_string: String,

    /// Appended to input columns that share a name with a tag
    pub original_columns_suffix: String,

    /// Text encoding of the CSV
    pub encoding: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log to file
    pub log_to_file: bool,

    /// Log file path
    pub log_file: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::new(), // Empty = must be given on the command line
            path_column: "FILE_PATH".to_string(),
            encoding: DEFAULT_ENCODING.to_string(),
        }
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            default_timezone: "UTC".to_string(),
            progress_period_secs: None,
            datetime_tags: vec![
                "EXIF:DateTimeOriginal".to_string(),
                "EXIF:CreateDate".to_string(),
                "XMP:DateTimeOriginal".to_string(),
                "XMP:CreateDate".to_string(),
                "QuickTime:CreateDate".to_string(),
            ],
            target_tags: vec![],
        }
    }
}

impl Default for DatetimeCsvConfig {
    fn default() -> Self {
        let columns = DatetimeColumns::default();
        Self {
            path: PathBuf::new(),
            local_timezone: "UTC".to_string(),
            tag_column: columns.tag,
            raw_column: columns.raw,
            iso8601_column: columns.iso8601,
            local_unix_column: columns.local_unix,
            encoding: DEFAULT_ENCODING.to_string(),
        }
    }
}

impl Default for TagsCsvConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            masking_string: "●".to_string(),
            original_columns_suffix: "_ORG".to_string(),
            encoding: DEFAULT_ENCODING.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_file: PathBuf::from("./image_taken_datetime.log"),
        }
    }
}

impl InputConfig {
    pub fn encoding(&self) -> Result<CsvEncoding, ConfigError> {
        parse_encoding("input.encoding", &self.encoding, false)
    }
}

impl ExifToolConfig {
    /// Read timeout, `None` when unset or too large to wait for
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

impl ProcessConfig {
    /// Timezone for naive datetime values
    pub fn default_timezone(&self) -> Result<Tz, ConfigError> {
        parse_timezone("process.default_timezone", &self.default_timezone)
    }

    /// Progress period, `None` when reports are off
    pub fn progress_period(&self) -> Option<Duration> {
        self.progress_period_secs
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

impl DatetimeCsvConfig {
    pub fn local_timezone(&self) -> Result<Tz, ConfigError> {
        parse_timezone("output.datetime_csv.local_timezone", &self.local_timezone)
    }

    pub fn encoding(&self) -> Result<CsvEncoding, ConfigError> {
        parse_encoding("output.datetime_csv.encoding", &self.encoding, true)
    }

    pub fn columns(&self) -> DatetimeColumns {
        DatetimeColumns {
            tag: self.tag_column.clone(),
            raw: self.raw_column.clone(),
            iso8601: self.iso8601_column.clone(),
            local_unix: self.local_unix_column.clone(),
        }
    }
}

impl TagsCsvConfig {
    pub fn encoding(&self) -> Result<CsvEncoding, ConfigError> {
        parse_encoding("output.tags_csv.encoding", &self.encoding, true)
    }
}

fn parse_encoding(key: &str, label: &str, for_output: bool) -> Result<CsvEncoding, ConfigError> {
    let encoding = CsvEncoding::from_label(label).map_err(|_| {
        ConfigError::ValidationError(format!("\"{}\" is not supported as \"{}\"", label, key))
    })?;
    if for_output && !encoding.can_encode() {
        return Err(ConfigError::ValidationError(format!(
            "\"{}\" cannot be written, choose another \"{}\"",
            label, key
        )));
    }
    Ok(encoding)
}

fn parse_timezone(key: &str, name: &str) -> Result<Tz, ConfigError> {
    name.trim().parse::<Tz>().map_err(|_| {
        ConfigError::ValidationError(format!(
            "\"{}\" is not supported as \"{}\"",
            name, key
        ))
    })
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./config.toml (current directory)
    /// 2. ./image_taken_datetime.toml (current directory - alternative name)
    /// 3. Standard config location
    ///
    /// If no config file is found, returns default configuration.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::find_config_path() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// First existing config file in search order.
    pub fn find_config_path() -> Option<PathBuf> {
        LOCAL_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
            .or_else(|| get_config_path().filter(|path| path.exists()))
    }

    /// Get the path where the config file is (or would be) located.
    pub fn get_active_config_path() -> PathBuf {
        Self::find_config_path()
            .or_else(get_config_path)
            .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_PATHS[0]))
    }

    /// Check values that TOML parsing alone cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.process.default_timezone()?;
        self.output.datetime_csv.local_timezone()?;
        self.input.encoding()?;
        self.output.datetime_csv.encoding()?;
        self.output.tags_csv.encoding()?;

        if let Some(secs) = self.process.progress_period_secs {
            if secs.is_nan() || secs < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "process.progress_period_secs must not be negative, got {}",
                    secs
                )));
            }
        }

        if let Some(secs) = self.exiftool.read_timeout_secs {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "exiftool.read_timeout_secs must be a positive number, got {}",
                    secs
                )));
            }
        }

        if self.input.path_column.is_empty() {
            return Err(ConfigError::ValidationError(
                "input.path_column must not be empty".to_string(),
            ));
        }

        let tags_csv = &self.output.tags_csv;
        if tags_csv.masking_string.is_empty() {
            return Err(ConfigError::ValidationError(
                "output.tags_csv.masking_string must be 1 length at least".to_string(),
            ));
        }
        if tags_csv.original_columns_suffix.is_empty() {
            return Err(ConfigError::ValidationError(
                "output.tags_csv.original_columns_suffix must be 1 length at least".to_string(),
            ));
        }

        let columns = self.output.datetime_csv.columns();
        let names = columns.names();
        if names.iter().any(|name| name.is_empty()) {
            return Err(ConfigError::ValidationError(
                "output.datetime_csv column names must not be empty".to_string(),
            ));
        }
        if names.iter().collect::<HashSet<_>>().len() != names.len() {
            return Err(ConfigError::ValidationError(
                "output.datetime_csv column names must be distinct".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {}, got \"{}\"",
                LOG_LEVELS.join(", "),
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path.as_ref(), content)
            .map_err(|e| ConfigError::WriteError(path.as_ref().to_path_buf(), e.to_string()))?;

        Ok(())
    }

    /// Generate a default config file with comments
    /// This uses the example config file to ensure it stays up to date
    pub fn generate_default_config() -> String {
        include_str!("../../config.example.toml").to_string()
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration file was not found at the specified path
    FileNotFound(PathBuf),
    /// Failed to read the configuration file
    ReadError(PathBuf, String),
    /// Failed to parse the configuration file (invalid TOML)
    ParseError(PathBuf, String),
    /// Failed to serialize configuration to TOML
    SerializeError(String),
    /// Failed to write configuration file
    WriteError(PathBuf, String),
    /// A value is out of range or unknown
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ReadError(path, err) => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::ParseError(path, err) => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::SerializeError(err) => {
                write!(f, "Failed to serialize configuration: {}", err)
            }
            ConfigError::WriteError(path, err) => {
                write!(
                    f,
                    "Failed to write config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "Invalid configuration: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
