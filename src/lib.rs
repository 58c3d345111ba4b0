//! Image Taken Datetime Library
//!
//! Extract the taken datetime and other metadata of images and videos by
//! driving one long-lived ExifTool process, then write the results as new
//! columns of a CSV.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`exiftool`] - The persistent ExifTool worker session and its protocol
//! - [`datetime`] - Datetime parsing, tag priority resolution and projections
//! - [`table`] - Reading and writing the CSV files
//! - [`report`] - The datetime and tags reports built on top of a session
//! - [`core`] - Configuration and error types
//! - [`cli`] - Command-line interface (only used by the binary)
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use chrono_tz::Tz;
//! use image_taken_datetime::datetime::{project, resolve};
//! use image_taken_datetime::exiftool::{ExifToolBinary, ExifToolSession};
//!
//! fn main() -> anyhow::Result<()> {
//!     let tags = vec![
//!         "EXIF:DateTimeOriginal".to_string(),
//!         "QuickTime:CreateDate".to_string(),
//!     ];
//!
//!     let mut session = ExifToolSession::start(ExifToolBinary::locate()?, tags.clone())?;
//!     let paths = vec!["a.jpg".to_string(), "b.mov".to_string()];
//!     let results = session.execute_on_files(&paths, None)?;
//!     session.close();
//!
//!     for candidate in resolve(&results, &tags, Tz::Asia__Tokyo) {
//!         let row = project(&candidate, &Tz::Asia__Tokyo);
//!         println!("{:?} {:?}", row.iso8601, row.local_unix);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod datetime;
pub mod exiftool;
pub mod report;
pub mod table;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
