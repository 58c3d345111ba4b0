//! Core functionality module
//!
//! Configuration management and the ExifTool error types shared by the
//! other modules.
//!
//! # Submodules
//!
//! - `config` - Configuration loading, saving, and management
//! - `error` - Error types and result aliases

pub mod config;
pub mod error;
