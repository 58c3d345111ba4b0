//! Progress reporting while a batch is being processed
//!
//! The worker gives no structured progress, so the tracker counts `}`
//! characters in the raw output as an estimate of finished records. A string
//! value containing `}` inflates the count; the number is for display only.

use log::info;
use std::time::{Duration, Instant};

/// Receives progress updates for one batch.
pub trait ProgressObserver {
    /// Called once before the first output line is read.
    fn started(&mut self, total: usize);

    /// Called at most once per progress period.
    fn progressed(&mut self, processed: usize, total: usize);

    /// Called once after the `{ready}` sentinel.
    fn completed(&mut self, total: usize);
}

/// Observer writing progress as info-level log lines
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn started(&mut self, total: usize) {
        info!("ExifTool processing... [0/{} valid files]", total);
    }

    fn progressed(&mut self, processed: usize, total: usize) {
        info!(
            "ExifTool processing... [{}/{} valid files]",
            processed, total
        );
    }

    fn completed(&mut self, total: usize) {
        info!(
            "ExifTool processing has been completed. [{}/{} valid files]",
            total, total
        );
    }
}

/// Period-throttled progress state for one batch.
///
/// Reports are disabled unless the period is positive.
pub struct ProgressTracker<'a> {
    period: Option<Duration>,
    observer: &'a mut dyn ProgressObserver,
    total: usize,
    processed: usize,
    started_at: Instant,
    next_report: Duration,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(
        period: Option<Duration>,
        total: usize,
        observer: &'a mut dyn ProgressObserver,
    ) -> Self {
        let period = period.filter(|p| !p.is_zero());
        Self {
            period,
            observer,
            total,
            processed: 0,
            started_at: Instant::now(),
            next_report: period.unwrap_or_default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.period.is_some()
    }

    /// Estimated number of finished records so far.
    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn start(&mut self) {
        self.started_at = Instant::now();
        if self.is_enabled() {
            self.observer.started(self.total);
        }
    }

    /// Account for one output line and report if the period has elapsed.
    ///
    /// Missed periods are not caught up: the next deadline moves forward by a
    /// single period per report.
    pub fn record_line(&mut self, line: &str) {
        self.processed += line.matches('}').count();

        if let Some(period) = self.period {
            if self.started_at.elapsed() >= self.next_report {
                self.next_report += period;
                self.observer.progressed(self.processed, self.total);
            }
        }
    }

    pub fn finish(&mut self) {
        if self.is_enabled() {
            self.observer.completed(self.total);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Observer that records every call
    #[derive(Debug, Default)]
    pub(crate) struct RecordingObserver {
        pub events: Vec<String>,
    }

    impl ProgressObserver for RecordingObserver {
        fn started(&mut self, total: usize) {
            self.events.push(format!("start {}", total));
        }

        fn progressed(&mut self, processed: usize, total: usize) {
            self.events.push(format!("{}/{}", processed, total));
        }

        fn completed(&mut self, total: usize) {
            self.events.push(format!("done {}", total));
        }
    }

    #[test]
    fn test_disabled_without_period() {
        let mut observer = RecordingObserver::default();
        let mut tracker = ProgressTracker::new(None, 2, &mut observer);
        tracker.start();
        tracker.record_line("{\"a\": 1},\n");
        tracker.finish();
        assert_eq!(tracker.processed(), 1);
        assert!(observer.events.is_empty());
    }

    #[test]
    fn test_zero_period_is_disabled() {
        let mut observer = RecordingObserver::default();
        let mut tracker = ProgressTracker::new(Some(Duration::ZERO), 1, &mut observer);
        assert!(!tracker.is_enabled());
        tracker.start();
        tracker.finish();
        assert!(observer.events.is_empty());
    }

    #[test]
    fn test_counts_closing_braces() {
        let mut observer = RecordingObserver::default();
        let mut tracker = ProgressTracker::new(None, 3, &mut observer);
        tracker.record_line("[{\n");
        tracker.record_line("  \"SourceFile\": \"a.jpg\"\n");
        tracker.record_line("},\n");
        tracker.record_line("{\"SourceFile\": \"b}.jpg\"}]\n");
        // The brace inside the file name is counted too
        assert_eq!(tracker.processed(), 3);
    }

    #[test]
    fn test_reports_once_per_elapsed_period() {
        let mut observer = RecordingObserver::default();
        {
            let mut tracker =
                ProgressTracker::new(Some(Duration::from_millis(20)), 2, &mut observer);
            tracker.start();
            // Not yet due
            tracker.record_line("{},\n");
            std::thread::sleep(Duration::from_millis(50));
            tracker.record_line("{}\n");
            tracker.finish();
        }
        assert_eq!(observer.events.first().map(String::as_str), Some("start 2"));
        assert_eq!(observer.events.last().map(String::as_str), Some("done 2"));
        assert!(observer.events.contains(&"2/2".to_string()));
    }
}
