//! Command handler implementations
//!
//! This module contains the implementation of all CLI commands.

use crate::cli::progress::{
    format_duration, print_error, print_header, print_info, print_success, BarProgress,
};
use crate::cli::{Args, Commands};
use crate::core::config::{get_config_dir, Config};
use crate::datetime::DatetimeResolver;
use crate::exiftool::{ExifToolBinary, ExifToolSession, LogProgress, ProgressObserver};
use crate::report::{DatetimeReport, TagValueMode, TagsReport};
use crate::table::{check_new_path, Table};
use anyhow::{bail, Context, Result};
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Refresh period of the progress bar when no progress period is configured
const BAR_REFRESH_PERIOD: Duration = Duration::from_millis(250);

/// Run the command selected on the command line
pub fn run_command(args: &Args, config: &Config) -> Result<()> {
    match &args.command {
        Commands::Datetime { input, output } => {
            config.validate()?;
            extract_datetimes(config, input.clone(), output.clone(), args.progress_bar)?;
        }
        Commands::Tags { input, output } => {
            config.validate()?;
            list_tags(config, input.clone(), output.clone(), args.progress_bar)?;
        }
        Commands::Check => {
            check_exiftool(config)?;
        }
        Commands::ShowConfig => {
            show_config(config);
        }
        Commands::GenerateConfig { output } => {
            generate_config_file(output.clone())?;
        }
    }

    Ok(())
}

/// Locate ExifTool, logging the usual hint when it is missing.
fn locate_exiftool(config: &Config) -> Result<ExifToolBinary> {
    match ExifToolBinary::resolve(config.exiftool.path.as_deref()) {
        Ok(binary) => Ok(binary),
        Err(e) => {
            error!("\"exiftool\" is necessary, but not installed on this pc.");
            error!("See https://exiftool.org/index.html.");
            Err(e.into())
        }
    }
}

fn progress_observer(progress_bar: bool) -> Box<dyn ProgressObserver> {
    if progress_bar {
        Box::new(BarProgress::new())
    } else {
        Box::new(LogProgress)
    }
}

fn progress_period(config: &Config, progress_bar: bool) -> Option<Duration> {
    match config.process.progress_period() {
        Some(period) => Some(period),
        None if progress_bar => Some(BAR_REFRESH_PERIOD),
        None => None,
    }
}

/// Pick the CLI value, falling back to the configured one.
fn resolve_path(cli: Option<PathBuf>, configured: &Path, what: &str) -> Result<PathBuf> {
    let path = cli.unwrap_or_else(|| configured.to_path_buf());
    if path.as_os_str().is_empty() {
        bail!("No {} given: set it in the config file or on the command line", what);
    }
    Ok(path)
}

/// Add the taken datetime columns to the input CSV
pub fn extract_datetimes(
    config: &Config,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    progress_bar: bool,
) -> Result<()> {
    let started = Instant::now();
    let binary = locate_exiftool(config)?;

    let input_path = resolve_path(input, &config.input.csv_path, "input CSV")?;
    let output_path = resolve_path(output, &config.output.datetime_csv.path, "output CSV")?;

    let tags = config.process.datetime_tags.clone();
    if tags.is_empty() {
        bail!("process.datetime_tags must list at least one tag");
    }

    let report = DatetimeReport::new(
        DatetimeResolver::new(tags.clone(), config.process.default_timezone()?),
        config.output.datetime_csv.columns(),
        config.output.datetime_csv.local_timezone()?,
    );

    let output_encoding = config.output.datetime_csv.encoding()?;
    let mut table = Table::read_csv_encoded(
        &input_path,
        config.input.encoding()?,
        &[config.input.path_column.as_str()],
        false,
    )
    .with_context(|| format!("Failed to read the CSV \"{}\"", input_path.display()))?;
    report
        .check_columns(&table)
        .with_context(|| format!("Input CSV \"{}\"", input_path.display()))?;
    check_new_path(&output_path)?;

    let mut session = ExifToolSession::new(binary, tags)
        .with_read_timeout(config.exiftool.read_timeout());
    session.open()?;

    let mut observer = progress_observer(progress_bar);
    let found = report
        .run(
            &mut session,
            &mut table,
            &config.input.path_column,
            progress_period(config, progress_bar),
            observer.as_mut(),
        )
        .context("Failed to execute ExifTool on the files")?;
    session.close();

    table
        .write_csv_new_encoded(&output_path, output_encoding)
        .with_context(|| format!("Failed to write the CSV \"{}\"", output_path.display()))?;

    print_header("IMAGE TAKEN DATETIME");
    print_success(&format!("Found a datetime for {}/{} files", found, table.len()));
    if found < table.len() {
        print_info(&format!("{} files without a datetime", table.len() - found));
    }
    print_info(&format!("Output: {}", output_path.display()));
    print_info(&format!("Elapsed: {}", format_duration(started.elapsed())));

    Ok(())
}

/// Add one column per ExifTool tag to the input CSV
pub fn list_tags(
    config: &Config,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    progress_bar: bool,
) -> Result<()> {
    let started = Instant::now();
    let binary = locate_exiftool(config)?;

    let input_path = resolve_path(input, &config.input.csv_path, "input CSV")?;
    let output_path = resolve_path(output, &config.output.tags_csv.path, "output CSV")?;

    let tags_csv = &config.output.tags_csv;
    let target_tags = config.process.target_tags.clone();
    let report = TagsReport::new(
        TagValueMode::for_targets(&target_tags, &tags_csv.masking_string),
        tags_csv.original_columns_suffix.clone(),
    );

    let output_encoding = tags_csv.encoding()?;
    let mut table = Table::read_csv_encoded(
        &input_path,
        config.input.encoding()?,
        &[config.input.path_column.as_str()],
        true,
    )
    .with_context(|| format!("Failed to read the CSV \"{}\"", input_path.display()))?;
    if table.is_empty() {
        bail!("No lines in the csv \"{}\".", input_path.display());
    }
    check_new_path(&output_path)?;

    let mut session = ExifToolSession::new(binary, target_tags)
        .with_read_timeout(config.exiftool.read_timeout());
    session.open()?;

    let mut observer = progress_observer(progress_bar);
    let added = report
        .run(
            &mut session,
            &mut table,
            &config.input.path_column,
            progress_period(config, progress_bar),
            observer.as_mut(),
        )
        .context("Failed to execute ExifTool on the files")?;
    session.close();

    table
        .write_csv_new_encoded(&output_path, output_encoding)
        .with_context(|| format!("Failed to write the CSV \"{}\"", output_path.display()))?;

    print_header("EXIFTOOL TAGS");
    print_success(&format!("{} tag columns for {} files", added, table.len()));
    print_info(&format!("Output: {}", output_path.display()));
    print_info(&format!("Elapsed: {}", format_duration(started.elapsed())));

    Ok(())
}

/// Report whether ExifTool can be found
pub fn check_exiftool(config: &Config) -> Result<()> {
    match ExifToolBinary::resolve(config.exiftool.path.as_deref()) {
        Ok(binary) => {
            print_success(&format!("ExifTool found: {}", binary.path().display()));
            Ok(())
        }
        Err(e) => {
            print_error(&e.to_string());
            print_info("See https://exiftool.org/index.html.");
            bail!("ExifTool is not installed")
        }
    }
}

/// Generate a configuration file at the specified or default location
pub fn generate_config_file(output: Option<PathBuf>) -> Result<()> {
    let output_path = match output {
        Some(path) => path,
        None => {
            let dir = get_config_dir().context("Could not determine configuration directory")?;
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            dir.join("config.toml")
        }
    };

    if output_path.exists() {
        bail!(
            "Configuration file already exists: {}",
            output_path.display()
        );
    }

    fs::write(&output_path, Config::generate_default_config())
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    info!("Configuration file: {}", output_path.display());
    info!("Edit this file to set the input CSV, tags and output columns.");
    info!("Run 'image-taken-datetime show-config' to verify your settings.");

    Ok(())
}

/// Show the current configuration settings
pub fn show_config(config: &Config) {
    let config_path = Config::get_active_config_path();
    info!("Configuration file: {}", config_path.display());
    if !config_path.exists() {
        info!("(Using default settings - no config file found)");
    }
    if let Err(e) = config.validate() {
        warn!("{}", e);
    }
    info!("");
    info!("Current Configuration:");
    info!("----------------------");
    info!("[exiftool]");
    match &config.exiftool.path {
        Some(path) => info!("  path = \"{}\"", path.display()),
        None => info!("  path = (search PATH)"),
    }
    match config.exiftool.read_timeout_secs {
        Some(secs) => info!("  read_timeout_secs = {}", secs),
        None => info!("  read_timeout_secs = (none)"),
    }
    info!("");
    info!("[input]");
    info!("  csv_path = \"{}\"", config.input.csv_path.display());
    info!("  path_column = \"{}\"", config.input.path_column);
    info!("  encoding = \"{}\"", config.input.encoding);
    info!("");
    info!("[process]");
    info!("  default_timezone = \"{}\"", config.process.default_timezone);
    match config.process.progress_period_secs {
        Some(secs) => info!("  progress_period_secs = {}", secs),
        None => info!("  progress_period_secs = (no progress reports)"),
    }
    info!("  datetime_tags = {:?}", config.process.datetime_tags);
    if config.process.target_tags.is_empty() {
        info!("  target_tags = [] (all tags mode)");
    } else {
        info!("  target_tags = {:?}", config.process.target_tags);
    }
    info!("");
    let datetime_csv = &config.output.datetime_csv;
    info!("[output.datetime_csv]");
    info!("  path = \"{}\"", datetime_csv.path.display());
    info!("  local_timezone = \"{}\"", datetime_csv.local_timezone);
    info!("  tag_column = \"{}\"", datetime_csv.tag_column);
    info!("  raw_column = \"{}\"", datetime_csv.raw_column);
    info!("  iso8601_column = \"{}\"", datetime_csv.iso8601_column);
    info!("  local_unix_column = \"{}\"", datetime_csv.local_unix_column);
    info!("  encoding = \"{}\"", datetime_csv.encoding);
    info!("");
    let tags_csv = &config.output.tags_csv;
    info!("[output.tags_csv]");
    info!("  path = \"{}\"", tags_csv.path.display());
    info!("  masking_string = \"{}\"", tags_csv.masking_string);
    info!(
        "  original_columns_suffix = \"{}\"",
        tags_csv.original_columns_suffix
    );
    info!("  encoding = \"{}\"", tags_csv.encoding);
    info!("");
    info!("[logging]");
    info!("  level = \"{}\"", config.logging.level);
    info!("  log_to_file = {}", config.logging.log_to_file);
    info!("  log_file = \"{}\"", config.logging.log_file.display());
}
