//! Command-line argument definitions
//!
//! This module defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Extract image taken datetimes and other tag values from media files with ExifTool
#[derive(Parser, Debug)]
#[command(name = "image-taken-datetime")]
#[command(version)]
#[command(about = "Extract image taken datetimes and other ExifTool tag values into CSV", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace (overrides config)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Show a progress bar instead of progress log lines
    #[arg(long, global = true)]
    pub progress_bar: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add the image taken datetime of every listed file to a new CSV
    Datetime {
        /// Input CSV listing the files (overrides config)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// New output CSV (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List ExifTool tag values of every listed file in a new CSV
    ///
    /// With `target_tags` configured the values are shown. Without, every
    /// tag is listed and its values are masked.
    Tags {
        /// Input CSV listing the files (overrides config)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// New output CSV (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check whether ExifTool is installed
    Check,

    /// Show current configuration
    ShowConfig,

    /// Generate a configuration file at a specific location
    GenerateConfig {
        /// Output path for the config file (defaults to standard location)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
