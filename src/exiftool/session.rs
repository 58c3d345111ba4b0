//! Lifecycle of one persistent ExifTool worker process
//!
//! A session moves `Closed → Open → Closing → Closed`. Closing is best-effort
//! and idempotent: every step is attempted even if an earlier one failed, and
//! it runs again from `Drop`, so no worker outlives its session.

use crate::core::error::{ExifToolError, Result};
use crate::exiftool::binary::{ExifToolBinary, WorkerLauncher};
use crate::exiftool::channel::{LineSource, PumpedLines};
use crate::exiftool::protocol::{worker_args, SHUTDOWN_DIRECTIVE};
use log::{debug, info, warn};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::process::{Child, ChildStdin, ExitStatus};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How long a worker may take to exit after the shutdown directive
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Poll interval while waiting for the worker to exit
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open,
    Closing,
}

/// Process handle and pipes of a running worker
pub(super) struct Worker {
    child: Child,
    pub(super) stdin: Option<BufWriter<ChildStdin>>,
    pub(super) stdout: Option<Box<dyn LineSource>>,
    threads: Vec<JoinHandle<()>>,
}

/// A persistent ExifTool worker restricted to a fixed set of tags.
///
/// # Example
///
/// ```rust,no_run
/// use image_taken_datetime::exiftool::{ExifToolBinary, ExifToolSession};
///
/// let binary = ExifToolBinary::locate()?;
/// let mut session = ExifToolSession::new(binary, vec!["EXIF:DateTimeOriginal".to_string()]);
/// session.open()?;
/// let results = session.execute_on_files(&["photo.jpg"], None)?;
/// session.close();
/// # Ok::<(), image_taken_datetime::core::error::ExifToolError>(())
/// ```
pub struct ExifToolSession<L: WorkerLauncher = ExifToolBinary> {
    launcher: L,
    target_tags: Vec<String>,
    read_timeout: Option<Duration>,
    state: SessionState,
    desynchronized: bool,
    pub(super) worker: Option<Worker>,
}

impl<L: WorkerLauncher> ExifToolSession<L> {
    /// Create a closed session. An empty tag list extracts every tag.
    pub fn new(launcher: L, target_tags: Vec<String>) -> Self {
        Self {
            launcher,
            target_tags,
            read_timeout: None,
            state: SessionState::Closed,
            desynchronized: false,
            worker: None,
        }
    }

    /// Bound every output read by `timeout`. `None` waits forever.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Create and open a session in one step.
    pub fn start(launcher: L, target_tags: Vec<String>) -> Result<Self> {
        let mut session = Self::new(launcher, target_tags);
        session.open()?;
        Ok(session)
    }

    pub fn target_tags(&self) -> &[String] {
        &self.target_tags
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// Whether a previous batch broke the protocol framing.
    pub fn is_desynchronized(&self) -> bool {
        self.desynchronized
    }

    /// Start the worker process.
    pub fn open(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Err(ExifToolError::AlreadyOpen);
        }

        let args = worker_args(&self.target_tags);
        debug!(
            "Starting {} with args: {}",
            self.launcher.display_name(),
            args.join(" ")
        );

        let mut child = self
            .launcher
            .launch(&args)
            .map_err(ExifToolError::SpawnFailed)?;

        let mut threads = Vec::new();

        if let Some(stderr) = child.stderr.take() {
            match spawn_stderr_drain(stderr) {
                Ok(handle) => threads.push(handle),
                Err(e) => warn!("Failed to watch ExifTool stderr: {}", e),
            }
        }

        let stdout: Option<Box<dyn LineSource>> = match (child.stdout.take(), self.read_timeout)
        {
            (Some(stdout), None) => Some(Box::new(BufReader::new(stdout))),
            (Some(stdout), Some(timeout)) => match PumpedLines::spawn(stdout, timeout) {
                Ok((lines, handle)) => {
                    threads.push(handle);
                    Some(Box::new(lines))
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ExifToolError::SpawnFailed(e));
                }
            },
            (None, _) => None,
        };

        let stdin = child.stdin.take().map(BufWriter::new);

        self.worker = Some(Worker {
            child,
            stdin,
            stdout,
            threads,
        });
        self.state = SessionState::Open;
        self.desynchronized = false;

        info!("ExifTool started ({})", self.launcher.display_name());
        Ok(())
    }

    /// Stop the worker. Safe to call any number of times.
    pub fn close(&mut self) {
        let Some(mut worker) = self.worker.take() else {
            self.state = SessionState::Closed;
            return;
        };
        self.state = SessionState::Closing;

        // 1. Ask the worker to leave stay-open mode
        if let Some(stdin) = worker.stdin.as_mut() {
            if let Err(e) = stdin
                .write_all(SHUTDOWN_DIRECTIVE.as_bytes())
                .and_then(|()| stdin.flush())
            {
                warn!("Failed to close exiftool.: {}", e);
            }
        }

        // 2. Close the pipes
        if let Some(stdin) = worker.stdin.take() {
            if let Err(e) = stdin.into_inner() {
                warn!("Failed to close ExifTool stdin: {}", e.error());
            }
        }
        drop(worker.stdout.take());

        // 3. Make sure the process is gone
        stop_process(&mut worker.child);

        for handle in worker.threads.drain(..) {
            if handle.join().is_err() {
                warn!("An ExifTool stream thread panicked");
            }
        }

        self.state = SessionState::Closed;
        self.desynchronized = false;
        debug!("ExifTool session closed");
    }

    /// Fail unless a batch can be sent right now.
    pub(super) fn ensure_ready(&self) -> Result<()> {
        let worker = self.worker.as_ref().ok_or(ExifToolError::NotOpen)?;
        if self.desynchronized {
            return Err(ExifToolError::Desynchronized);
        }
        if worker.stdin.is_none() || worker.stdout.is_none() {
            return Err(ExifToolError::NoStreamConnection);
        }
        Ok(())
    }

    /// Borrow the worker's input and output for one batch.
    pub(super) fn streams_mut(&mut self) -> Result<(&mut dyn Write, &mut dyn LineSource)> {
        let worker = self.worker.as_mut().ok_or(ExifToolError::NotOpen)?;
        match (worker.stdin.as_mut(), worker.stdout.as_mut()) {
            (Some(stdin), Some(stdout)) => Ok((stdin, stdout.as_mut())),
            _ => Err(ExifToolError::NoStreamConnection),
        }
    }

    pub(super) fn mark_desynchronized(&mut self) {
        self.desynchronized = true;
    }
}

impl<L: WorkerLauncher> Drop for ExifToolSession<L> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Forward every stderr line of the worker to the log.
fn spawn_stderr_drain<R: Read + Send + 'static>(stderr: R) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("exiftool-stderr".to_string())
        .spawn(move || {
            for line in BufReader::new(stderr).lines() {
                match line {
                    Ok(line) if line.trim().is_empty() => {}
                    Ok(line) => warn!("ExifTool: {}", line.trim_end()),
                    Err(_) => break,
                }
            }
        })
}

/// Wait for a graceful exit, then terminate.
fn stop_process(child: &mut Child) {
    match wait_with_grace(child, SHUTDOWN_GRACE) {
        Ok(Some(status)) => {
            debug!("ExifTool exited with {}", status);
            return;
        }
        Ok(None) => debug!("ExifTool did not exit in time, terminating"),
        Err(e) => warn!("Failed to poll ExifTool process: {}", e),
    }

    if let Err(e) = child.kill() {
        warn!("Failed to terminate ExifTool process: {}", e);
    }
    if let Err(e) = child.wait() {
        warn!("Failed to close process.: {}", e);
    }
}

fn wait_with_grace(child: &mut Child, grace: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + grace;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::exiftool::mock::ScriptedWorker;

    #[test]
    fn test_open_and_close() {
        let mut session = ExifToolSession::new(ScriptedWorker::echo("2022:01:02 03:04:05"), vec![]);
        assert_eq!(session.state(), SessionState::Closed);

        session.open().unwrap();
        assert_eq!(session.state(), SessionState::Open);
        assert!(session.is_open());

        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!session.is_open());
    }

    #[test]
    fn test_open_twice_fails() {
        let mut session =
            ExifToolSession::start(ScriptedWorker::echo("2022:01:02 03:04:05"), vec![]).unwrap();
        let err = session.open().unwrap_err();
        assert!(matches!(err, ExifToolError::AlreadyOpen));
        // Still usable after the failed second open
        assert!(session.is_open());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut session =
            ExifToolSession::start(ScriptedWorker::echo("2022:01:02 03:04:05"), vec![]).unwrap();
        session.close();
        session.close();
        assert_eq!(session.state(), SessionState::Closed);

        // Closing a session that was never opened is a no-op too
        let mut never_opened = ExifToolSession::new(ScriptedWorker::echo("x"), vec![]);
        never_opened.close();
        assert_eq!(never_opened.state(), SessionState::Closed);
    }

    #[test]
    fn test_reopen_after_close() {
        let mut session =
            ExifToolSession::start(ScriptedWorker::echo("2022:01:02 03:04:05"), vec![]).unwrap();
        session.close();
        session.open().unwrap();
        assert!(session.is_open());
    }

    #[test]
    fn test_close_terminates_worker_ignoring_shutdown() {
        // This worker never honours -stay_open False; close must still finish
        let mut session = ExifToolSession::start(ScriptedWorker::stubborn(), vec![]).unwrap();
        let started = Instant::now();
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(started.elapsed() < SHUTDOWN_GRACE + Duration::from_secs(5));
    }

    /// Wait until the worker has written its pid.
    fn read_pid(pid_file: &std::path::Path) -> u32 {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Ok(text) = std::fs::read_to_string(pid_file) {
                if let Ok(pid) = text.trim().parse() {
                    return pid;
                }
            }
            assert!(Instant::now() < deadline, "worker never wrote its pid");
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn process_alive(pid: u32) -> bool {
        std::process::Command::new("kill")
            .arg("-0")
            .arg(pid.to_string())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_drop_reaps_open_worker() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let pid_file = temp_dir.path().join("worker.pid");

        let session = ExifToolSession::start(
            ScriptedWorker::echo("2022:01:02 03:04:05").recording_pid(&pid_file),
            vec![],
        )
        .unwrap();
        let pid = read_pid(&pid_file);
        assert!(process_alive(pid));

        drop(session);
        assert!(!process_alive(pid));
    }

    #[test]
    fn test_drop_kills_worker_ignoring_shutdown() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let pid_file = temp_dir.path().join("worker.pid");

        let session = ExifToolSession::start(
            ScriptedWorker::stubborn().recording_pid(&pid_file),
            vec![],
        )
        .unwrap();
        let pid = read_pid(&pid_file);
        assert!(process_alive(pid));

        drop(session);
        assert!(!process_alive(pid));
    }

    #[test]
    fn test_spawn_failure() {
        let mut session = ExifToolSession::new(ScriptedWorker::unlaunchable(), vec![]);
        let err = session.open().unwrap_err();
        assert!(matches!(err, ExifToolError::SpawnFailed(_)));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_worker_receives_tag_arguments() {
        let mut session = ExifToolSession::start(
            ScriptedWorker::args_echo(),
            vec!["EXIF:DateTimeOriginal".to_string()],
        )
        .unwrap();
        let temp_dir = tempfile::TempDir::new().unwrap();
        let file = temp_dir.path().join("a.jpg");
        std::fs::File::create(&file).unwrap();

        let results = session
            .execute_on_files(&[file.to_string_lossy().to_string()], None)
            .unwrap();
        let args = results[0].as_ref().unwrap().value_text("Args").unwrap();
        assert!(args.starts_with("-stay_open True -@ - -common_args -j -G -a"));
        assert!(args.ends_with("-EXIF:DateTimeOriginal"));
    }
}
