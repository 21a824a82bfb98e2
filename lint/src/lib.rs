//! Asynchronous sqlfluff diagnostics for editor buffers.
//!
//! Each check runs the linter on a snapshot of the buffer, parses its
//! JSON annotations and maps them to host text ranges. A newer check on
//! the same buffer kills and silently discards the older one.

pub mod error;
pub mod output;
pub mod position;
pub mod types;

pub(crate) mod process;

mod coordinator;
mod manager;
mod session;

pub use coordinator::{CheckCoordinator, CheckState};
pub use error::{CheckError, ParseError, ProcessError, SpawnError};
pub use manager::{LintEvent, LintManager};
pub use session::{ProcessOutput, ProcessSession, SessionEvent, SessionId, SessionStatus};
pub use types::{
    BufferId, Diagnostic, DiagnosticRecord, DiagnosticSink, Dialect, LintConfig,
    PositionEncoding, Severity, TextRange,
};
