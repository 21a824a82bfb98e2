//! Failure taxonomy for a single check.
//!
//! A superseded check is not an error and has no variant here: it is
//! dropped silently by the coordinator.

use std::io;
use std::time::Duration;

/// The linter process could not be started. Fatal to that check only.
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("linter executable '{executable}' not found")]
    NotFound {
        executable: String,
        #[source]
        source: which::Error,
    },
    #[error("failed to launch '{executable}'")]
    Launch {
        executable: String,
        #[source]
        source: io::Error,
    },
}

/// The linter started but did not produce usable output.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("I/O error talking to the linter")]
    Io(#[from] io::Error),
    #[error("linter timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("linter exited with {} and no output: {stderr}", exit_label(.code))]
    Exited { code: Option<i32>, stderr: String },
}

fn exit_label(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("status {code}"),
        None => String::from("a signal"),
    }
}

/// The linter's output did not match the issue schema.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("linter output is not a JSON array")]
    Json(#[source] serde_json::Error),
    #[error("issue #{index} in linter output is malformed")]
    MalformedRecord {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Any failure surfaced to the host through
/// [`DiagnosticSink::report_error`](crate::DiagnosticSink::report_error).
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}
