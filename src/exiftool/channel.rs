//! Framed batch protocol on top of a session
//!
//! One batch is: write the paths and `-execute`, then accumulate output lines
//! until the exact `{ready}` line, then decode everything before it as one
//! JSON array. The state machine is explicit on purpose: the sentinel is not
//! JSON and must never reach the decoder.
//!
//! Reads block without limit unless the session was given a read timeout.

use crate::core::error::{ExifToolError, Result};
use crate::exiftool::binary::WorkerLauncher;
use crate::exiftool::progress::{LogProgress, ProgressObserver, ProgressTracker};
use crate::exiftool::protocol::{is_ready_line, EXECUTE_DIRECTIVE};
use crate::exiftool::reconcile::{reconcile, ExistenceMask, ReconciledResult};
use crate::exiftool::record::MetadataRecord;
use crate::exiftool::session::ExifToolSession;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, warn};
use std::collections::HashSet;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Source of worker output lines
pub trait LineSource {
    /// Next line with its terminator, or `None` once the stream has ended.
    fn next_line(&mut self) -> Result<Option<String>>;
}

impl<R: BufRead> LineSource for R {
    fn next_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        match self.read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(line)),
            Err(e) => Err(ExifToolError::ReadFailed(e)),
        }
    }
}

/// Lines read on a helper thread so each wait can be bounded.
pub struct PumpedLines {
    rx: Receiver<io::Result<String>>,
    timeout: Duration,
}

impl PumpedLines {
    /// Start forwarding lines of `reader`. The thread ends at end of stream
    /// or once the returned source is dropped and the next line arrives.
    pub fn spawn<R: Read + Send + 'static>(
        reader: R,
        timeout: Duration,
    ) -> io::Result<(Self, JoinHandle<()>)> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = thread::Builder::new()
            .name("exiftool-stdout".to_string())
            .spawn(move || {
                let mut reader = BufReader::new(reader);
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line) {
                        Ok(0) => break,
                        Ok(_) => {
                            if tx.send(Ok(line)).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            let _ = tx.send(Err(e));
                            break;
                        }
                    }
                }
            })?;
        Ok((Self { rx, timeout }, handle))
    }
}

impl LineSource for PumpedLines {
    fn next_line(&mut self) -> Result<Option<String>> {
        match self.rx.recv_timeout(self.timeout) {
            Ok(Ok(line)) => Ok(Some(line)),
            Ok(Err(e)) => Err(ExifToolError::ReadFailed(e)),
            Err(RecvTimeoutError::Timeout) => Err(ExifToolError::ReadTimeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }
}

/// Send one batch: the paths one per line, then `-execute`, then flush.
///
/// Relative paths starting with `-` would be read as options, so they are
/// sent as `./-name`.
pub fn write_batch<W: Write + ?Sized>(writer: &mut W, paths: &[&str]) -> io::Result<()> {
    for path in paths {
        if path.starts_with('-') {
            writeln!(writer, "./{}", path)?;
        } else {
            writeln!(writer, "{}", path)?;
        }
    }
    writeln!(writer, "{}", EXECUTE_DIRECTIVE)?;
    writer.flush()
}

/// Accumulate output up to (not including) the `{ready}` line.
pub fn read_response<S: LineSource + ?Sized>(
    source: &mut S,
    tracker: &mut ProgressTracker<'_>,
) -> Result<String> {
    let mut payload = String::new();
    tracker.start();

    loop {
        let line = source
            .next_line()?
            .ok_or(ExifToolError::WorkerTerminatedUnexpectedly)?;
        if is_ready_line(&line) {
            break;
        }
        tracker.record_line(&line);
        payload.push_str(&line);
    }

    tracker.finish();
    Ok(payload)
}

/// Decode a batch response into one record per file.
pub fn parse_records(payload: &str) -> Result<Vec<MetadataRecord>> {
    serde_json::from_str(payload).map_err(ExifToolError::MalformedOutput)
}

/// Configured tags that no record of the batch contains.
pub fn missing_target_tags<'a>(
    records: &[MetadataRecord],
    target_tags: &'a [String],
) -> Vec<&'a str> {
    if target_tags.is_empty() {
        return Vec::new();
    }

    let seen: HashSet<&str> = records.iter().flat_map(MetadataRecord::tag_names).collect();
    target_tags
        .iter()
        .map(String::as_str)
        .filter(|tag| !seen.contains(tag))
        .collect()
}

impl<L: WorkerLauncher> ExifToolSession<L> {
    /// Run ExifTool on `paths`, logging progress every `progress_period`.
    ///
    /// The result has one entry per path, in input order; paths that do not
    /// exist get `None`.
    pub fn execute_on_files<P: AsRef<str>>(
        &mut self,
        paths: &[P],
        progress_period: Option<Duration>,
    ) -> Result<ReconciledResult> {
        let mut observer = LogProgress;
        self.execute_on_files_with(paths, progress_period, &mut observer)
    }

    /// Same as [`execute_on_files`](Self::execute_on_files) with a custom
    /// progress observer.
    pub fn execute_on_files_with<P: AsRef<str>>(
        &mut self,
        paths: &[P],
        progress_period: Option<Duration>,
        observer: &mut dyn ProgressObserver,
    ) -> Result<ReconciledResult> {
        self.ensure_ready()?;

        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let mask = ExistenceMask::compute(paths);
        if mask.present_count() == 0 {
            return Err(ExifToolError::AllFilesMissing { count: paths.len() });
        }

        let batch = mask.select(paths);
        debug!(
            "Sending {} of {} files to ExifTool",
            batch.len(),
            paths.len()
        );

        let records = match self.run_batch(&batch, progress_period, observer) {
            Ok(records) => records,
            Err(e) => {
                if e.is_session_fatal() {
                    self.mark_desynchronized();
                }
                return Err(e);
            }
        };

        for tag in missing_target_tags(&records, self.target_tags()) {
            warn!(
                "A target ExifTool tag was not found from input files.: \"{}\"",
                tag
            );
        }

        reconcile(&mask, records)
    }

    fn run_batch(
        &mut self,
        batch: &[&str],
        progress_period: Option<Duration>,
        observer: &mut dyn ProgressObserver,
    ) -> Result<Vec<MetadataRecord>> {
        let (stdin, stdout) = self.streams_mut()?;

        write_batch(stdin, batch).map_err(ExifToolError::WriteFailed)?;

        let mut tracker = ProgressTracker::new(progress_period, batch.len(), observer);
        let payload = read_response(stdout, &mut tracker)?;

        parse_records(&payload)
    }
}
