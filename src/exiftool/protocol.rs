//! Wire-level constants of the ExifTool `-stay_open` protocol.
//!
//! The worker reads an argument file from stdin (`-@ -`). Each line is one
//! argument; a `-execute` line runs everything queued since the previous one.
//! The reply is written to stdout and terminated by a `{ready}` line.

/// Options for a persistent worker: keep stdin open, read arguments from it,
/// then the common arguments applied to every batch (JSON output, group
/// prefixes on tag names, keep duplicate tags).
pub const STAY_OPEN_ARGS: &[&str] = &[
    "-stay_open",
    "True",
    "-@",
    "-",
    "-common_args",
    "-j",
    "-G",
    "-a",
];

/// Directive line that executes the queued batch.
pub const EXECUTE_DIRECTIVE: &str = "-execute";

/// Line that terminates one batch's response. Not part of the JSON payload.
pub const READY_SENTINEL: &str = "{ready}";

/// Directive that makes a persistent worker exit gracefully.
pub const SHUTDOWN_DIRECTIVE: &str = "-stay_open\nFalse\n";

/// Command-line arguments for a worker restricted to `target_tags`.
///
/// An empty tag list extracts every tag.
pub fn worker_args(target_tags: &[String]) -> Vec<String> {
    STAY_OPEN_ARGS
        .iter()
        .map(|arg| arg.to_string())
        .chain(target_tags.iter().map(|tag| format!("-{}", tag)))
        .collect()
}

/// Whether `line` (as read, terminator included) is the end-of-batch sentinel.
///
/// Only the line terminator is ignored; the rest must match exactly.
pub fn is_ready_line(line: &str) -> bool {
    line.trim_end_matches(['\r', '\n']) == READY_SENTINEL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_args_without_tags() {
        let args = worker_args(&[]);
        assert_eq!(args, STAY_OPEN_ARGS);
    }

    #[test]
    fn test_worker_args_with_tags() {
        let tags = vec![
            "EXIF:DateTimeOriginal".to_string(),
            "QuickTime:CreateDate".to_string(),
        ];
        let args = worker_args(&tags);
        assert_eq!(args.len(), STAY_OPEN_ARGS.len() + 2);
        assert_eq!(args[args.len() - 2], "-EXIF:DateTimeOriginal");
        assert_eq!(args[args.len() - 1], "-QuickTime:CreateDate");
    }

    #[test]
    fn test_ready_line_is_exact() {
        assert!(is_ready_line("{ready}\n"));
        assert!(is_ready_line("{ready}\r\n"));
        assert!(is_ready_line("{ready}"));
        assert!(!is_ready_line(" {ready}\n"));
        assert!(!is_ready_line("{ready}}\n"));
        assert!(!is_ready_line("\"x\": \"{ready}\"\n"));
        assert!(!is_ready_line("{ready1}\n"));
    }
}
