//! Progress bars and console output helpers for the CLI
//!
//! Key features:
//! - An `indicatif` bar that follows ExifTool batch progress
//! - Consistent visual styling for summaries
//! - A writer that tees log output to a file

use crate::exiftool::progress::ProgressObserver;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::{Duration, Instant};

// ============================================================================
// Styles - Consistent visual appearance
// ============================================================================

/// Get the progress bar style for ExifTool batches
fn progress_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {spinner:.green} [{bar:40.cyan/dim}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━╾─")
}

/// Get the style for completed progress bars
fn completed_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  ✓ [{bar:40.green/dim}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━━")
}

// ============================================================================
// Console output helpers
// ============================================================================

/// Print a header section with a box
pub fn print_header(title: &str) {
    let width = 68;
    let title_padded = format!("{:^width$}", title, width = width - 4);
    println!();
    println!("╔{}╗", "═".repeat(width - 2));
    println!("║{}║", title_padded);
    println!("╚{}╝", "═".repeat(width - 2));
    println!();
}

/// Print a success message with checkmark
pub fn print_success(msg: &str) {
    println!("  ✓ {}", msg);
}

/// Print an info message with bullet
pub fn print_info(msg: &str) {
    println!("  • {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    println!("  ✗ {}", msg);
}

// ============================================================================
// Progress bar for ExifTool batches
// ============================================================================

/// Progress bar fed by the batch progress tracker
///
/// The processed count is an estimate and may overshoot the number of files,
/// so the bar position is clamped to its length.
pub struct BarProgress {
    progress_bar: Option<ProgressBar>,
    start_time: Instant,
}

impl BarProgress {
    pub fn new() -> Self {
        Self {
            progress_bar: None,
            start_time: Instant::now(),
        }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for BarProgress {
    fn started(&mut self, total: usize) {
        let progress_bar = ProgressBar::new(total as u64);
        progress_bar.set_style(progress_bar_style());
        progress_bar.enable_steady_tick(Duration::from_millis(100));
        progress_bar.set_message("ExifTool processing...");
        self.progress_bar = Some(progress_bar);
        self.start_time = Instant::now();
    }

    fn progressed(&mut self, processed: usize, total: usize) {
        if let Some(progress_bar) = &self.progress_bar {
            progress_bar.set_position(processed.min(total) as u64);
        }
    }

    fn completed(&mut self, total: usize) {
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.set_style(completed_style());
            progress_bar.set_position(total as u64);
            progress_bar.finish_with_message(format!(
                "Complete in {}",
                format_duration(self.start_time.elapsed())
            ));
        }
    }
}

impl Drop for BarProgress {
    fn drop(&mut self) {
        // Batch failed before completion
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.abandon_with_message("✗ Aborted");
        }
    }
}

// ============================================================================
// Utility functions
// ============================================================================

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        format!("{}h {}m", hours, mins)
    } else if secs >= 60 {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

// ============================================================================
// Dual writer for file + console logging
// ============================================================================

/// A writer that writes to both console and file
///
/// Used for logging to both stderr and a log file simultaneously.
pub struct DualWriter {
    pub console: std::io::Stderr,
    pub file: std::fs::File,
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        // Write to console
        let _ = self.console.write(buf);
        // Write to file
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let _ = self.console.flush();
        self.file.flush()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30.0s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m");
    }

    #[test]
    fn test_bar_progress_lifecycle() {
        let mut progress = BarProgress::new();
        progress.progressed(1, 2); // before start: ignored
        progress.started(2);
        progress.progressed(5, 2);
        assert_eq!(progress.progress_bar.as_ref().unwrap().position(), 2);
        progress.completed(2);
        assert!(progress.progress_bar.is_none());
    }

    #[test]
    fn test_dual_writer() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("log.txt");
        let mut writer = DualWriter {
            console: std::io::stderr(),
            file: std::fs::File::create(&path).unwrap(),
        };
        writer.write_all(b"hello\n").unwrap();
        writer.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }
}
