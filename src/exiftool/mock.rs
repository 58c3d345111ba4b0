//! Scripted stand-ins for ExifTool used by the tests
//!
//! Each worker is a small POSIX shell loop speaking the same stdin/stdout
//! protocol as `exiftool -stay_open True -@ -`, so sessions and batches can be
//! exercised without ExifTool installed.

use crate::exiftool::binary::WorkerLauncher;
use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Fake worker driven by a shell script
#[derive(Debug, Clone)]
pub(crate) struct ScriptedWorker {
    program: String,
    script: String,
    env: Vec<(String, String)>,
}

impl ScriptedWorker {
    /// Worker loop: `on_path` runs for every path line with `$line` set,
    /// `on_execute` for every `-execute`. `-stay_open False` exits.
    fn looping(on_path: &str, on_execute: &str) -> Self {
        let script = format!(
            r#"started=0
while IFS= read -r line; do
  case "$line" in
    -stay_open)
      IFS= read -r flag
      if [ "$flag" = "False" ]; then exit 0; fi
      ;;
    -execute)
      {on_execute}
      ;;
    *)
      {on_path}
      ;;
  esac
done
"#
        );
        Self {
            program: "sh".to_string(),
            script,
            env: Vec::new(),
        }
    }

    /// Answers every path with `EXIF:DateTimeOriginal` set to `taken`.
    pub(crate) fn echo(taken: &str) -> Self {
        let mut worker = Self::looping(
            r#"if [ "$started" = 1 ]; then printf ',\n'; else printf '[\n'; started=1; fi
      printf '{"SourceFile": "%s", "EXIF:DateTimeOriginal": "%s"}\n' "$line" "$TAKEN""#,
            r#"if [ "$started" = 1 ]; then printf ']\n'; else printf '[]\n'; fi
      printf '{ready}\n'
      started=0"#,
        );
        worker.env.push(("TAKEN".to_string(), taken.to_string()));
        worker
    }

    /// Answers every path with its own command-line arguments under `Args`.
    pub(crate) fn args_echo() -> Self {
        Self::looping(
            r#"if [ "$started" = 1 ]; then printf ',\n'; else printf '[\n'; started=1; fi
      printf '{"SourceFile": "%s", "Args": "%s"}\n' "$line" "$*""#,
            r#"if [ "$started" = 1 ]; then printf ']\n'; else printf '[]\n'; fi
      printf '{ready}\n'
      started=0"#,
        )
    }

    /// Answers fewer records than paths received.
    pub(crate) fn drops_records() -> Self {
        Self::looping(":", r#"printf '[]\n{ready}\n'"#)
    }

    /// Prints partial output and exits before `{ready}`.
    pub(crate) fn terminating() -> Self {
        Self::looping(":", r#"printf '[{"SourceFile": "x"\n'; exit 3"#)
    }

    /// Answers with text that is not JSON.
    pub(crate) fn malformed() -> Self {
        Self::looping(":", r#"printf 'Error: this is not json\n{ready}\n'"#)
    }

    /// Never answers a batch.
    pub(crate) fn stalling() -> Self {
        Self::looping(":", ":")
    }

    /// Ignores the shutdown directive and keeps running after stdin closes.
    pub(crate) fn stubborn() -> Self {
        Self {
            program: "sh".to_string(),
            script: "while IFS= read -r line; do :; done; exec sleep 30".to_string(),
            env: Vec::new(),
        }
    }

    /// Writes the worker's process id to `pid_file` before anything else.
    pub(crate) fn recording_pid(mut self, pid_file: &Path) -> Self {
        self.script = format!("echo $$ > \"$PID_FILE\"\n{}", self.script);
        self.env.push((
            "PID_FILE".to_string(),
            pid_file.to_string_lossy().to_string(),
        ));
        self
    }

    /// A program that does not exist.
    pub(crate) fn unlaunchable() -> Self {
        Self {
            program: "/nonexistent/image-taken-datetime/fake-exiftool".to_string(),
            script: String::new(),
            env: Vec::new(),
        }
    }
}

impl WorkerLauncher for ScriptedWorker {
    fn launch(&self, args: &[String]) -> io::Result<Child> {
        Command::new(&self.program)
            .arg("-c")
            .arg(&self.script)
            .arg("fake-exiftool")
            .args(args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
    }

    fn display_name(&self) -> String {
        "fake-exiftool".to_string()
    }
}
