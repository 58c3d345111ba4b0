//! Locating the exiftool executable and launching worker processes.
//!
//! The lookup happens once at startup and its result, an [`ExifToolBinary`],
//! is handed to every session. Sessions only know the [`WorkerLauncher`]
//! trait, which lets tests substitute a scripted fake worker.

use crate::core::error::{ExifToolError, Result};
use log::debug;
use std::env;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// Program name searched on PATH
pub const EXIFTOOL_PROGRAM: &str = "exiftool";

/// Starts worker processes for a session.
pub trait WorkerLauncher {
    /// Start the worker with `args`, stdin, stdout and stderr all piped.
    fn launch(&self, args: &[String]) -> io::Result<Child>;

    /// Name used in log messages.
    fn display_name(&self) -> String;
}

/// A located exiftool executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExifToolBinary {
    path: PathBuf,
}

impl ExifToolBinary {
    /// Find `exiftool` on PATH.
    pub fn locate() -> Result<Self> {
        find_on_path(EXIFTOOL_PROGRAM)
            .map(|path| {
                debug!("Found exiftool at {}", path.display());
                Self { path }
            })
            .ok_or_else(|| ExifToolError::NotInstalled {
                program: EXIFTOOL_PROGRAM.to_string(),
            })
    }

    /// Use an explicitly configured executable.
    ///
    /// A bare program name (no directory part) is looked up on PATH.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let not_installed = || ExifToolError::NotInstalled {
            program: path.display().to_string(),
        };

        let is_bare_name = path.parent().map_or(true, |p| p.as_os_str().is_empty());
        if is_bare_name {
            return find_on_path(path.as_os_str())
                .map(|path| Self { path })
                .ok_or_else(not_installed);
        }

        if is_executable(path) {
            Ok(Self {
                path: path.to_path_buf(),
            })
        } else {
            Err(not_installed())
        }
    }

    /// Locate from an optional configured path, falling back to PATH.
    pub fn resolve(configured: Option<&Path>) -> Result<Self> {
        match configured {
            Some(path) => Self::from_path(path),
            None => Self::locate(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WorkerLauncher for ExifToolBinary {
    fn launch(&self, args: &[String]) -> io::Result<Child> {
        Command::new(&self.path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
    }

    fn display_name(&self) -> String {
        self.path.display().to_string()
    }
}

/// Whether exiftool can be found on PATH.
pub fn is_installed() -> bool {
    find_on_path(EXIFTOOL_PROGRAM).is_some()
}

/// Search the PATH directories for an executable named `program`.
pub fn find_on_path<S: AsRef<OsStr>>(program: S) -> Option<PathBuf> {
    let program = program.as_ref();
    let search_path = env::var_os("PATH")?;

    env::split_paths(&search_path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| candidate_names(program).map(move |name| dir.join(name)))
        .find(|candidate| is_executable(candidate))
}

#[cfg(windows)]
fn candidate_names(program: &OsStr) -> impl Iterator<Item = std::ffi::OsString> + '_ {
    ["", ".exe", ".bat", ".cmd"].into_iter().map(move |ext| {
        let mut name = program.to_os_string();
        name.push(ext);
        name
    })
}

#[cfg(not(windows))]
fn candidate_names(program: &OsStr) -> impl Iterator<Item = std::ffi::OsString> + '_ {
    std::iter::once(program.to_os_string())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_from_path_missing_file() {
        let err = ExifToolBinary::from_path("/nonexistent/dir/exiftool").unwrap_err();
        assert!(matches!(err, ExifToolError::NotInstalled { .. }));
    }

    #[test]
    fn test_from_path_bare_name_not_on_path() {
        let err = ExifToolBinary::from_path("definitely-not-a-real-exiftool-binary").unwrap_err();
        assert!(matches!(err, ExifToolError::NotInstalled { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_from_path_requires_executable_bit() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let script = temp_dir.path().join("exiftool");
        File::create(&script).unwrap();
        assert!(ExifToolBinary::from_path(&script).is_err());

        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let binary = ExifToolBinary::from_path(&script).unwrap();
        assert_eq!(binary.path(), script.as_path());
        assert_eq!(binary.display_name(), script.display().to_string());
    }

    #[cfg(unix)]
    #[test]
    fn test_find_on_path_finds_shell() {
        // sh is on PATH on every unix test machine
        let found = find_on_path("sh").unwrap();
        assert!(found.ends_with("sh"));
    }

    #[test]
    fn test_find_on_path_unknown_program() {
        assert!(find_on_path("no-such-program-for-image-taken-datetime").is_none());
    }
}
