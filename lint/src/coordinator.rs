//! Per-buffer check state machine.
//!
//! `Idle → Checking → Idle`. The current session lives in `current`;
//! `Some` is `Checking`, `None` is `Idle`. Starting a check replaces the
//! slot, which cancels whatever was there, so at most one session per
//! buffer is ever live. Completion events carry the session id and are
//! ignored unless they match the slot.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::{CheckError, ProcessError};
use crate::output;
use crate::position;
use crate::session::{ProcessOutput, ProcessSession, SessionEvent, SessionId};
use crate::types::{Diagnostic, DiagnosticSink, LintConfig};

/// Capacity of the per-buffer completion channel. Each session posts at
/// most one event.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Observable state of a buffer's checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Idle,
    Checking(SessionId),
}

pub struct CheckCoordinator<S> {
    config: LintConfig,
    sink: S,
    current: Option<ProcessSession>,
    next_session: u64,
    event_rx: mpsc::Receiver<SessionEvent>,
    event_tx: mpsc::Sender<SessionEvent>,
}

impl<S: DiagnosticSink> CheckCoordinator<S> {
    #[must_use]
    pub fn new(config: LintConfig, sink: S) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            sink,
            current: None,
            next_session: 1,
            event_rx,
            event_tx,
        }
    }

    #[must_use]
    pub fn config(&self) -> &LintConfig {
        &self.config
    }

    /// Use `config` for subsequent checks. An in-flight check keeps the
    /// configuration it was started with.
    pub fn set_config(&mut self, config: LintConfig) {
        self.config = config;
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    #[must_use]
    pub fn state(&self) -> CheckState {
        match &self.current {
            Some(session) => CheckState::Checking(session.id()),
            None => CheckState::Idle,
        }
    }

    /// Lint `text`, superseding any check still in flight.
    ///
    /// Returns as soon as the linter is spawned. A spawn failure is
    /// reported to the sink here and leaves the coordinator idle.
    /// Must be called from within a Tokio runtime.
    pub fn request_check(&mut self, text: impl Into<Arc<str>>) -> CheckState {
        self.cancel();

        let id = SessionId(self.next_session);
        self.next_session += 1;

        match ProcessSession::start(id, &self.config, text.into(), self.event_tx.clone()) {
            Ok(session) => {
                self.current = Some(session);
            }
            Err(e) => {
                tracing::warn!(session = %id, "Failed to start linter: {e}");
                self.sink.report_error(CheckError::Spawn(e));
            }
        }
        self.state()
    }

    /// Cancel the in-flight check, if any. Nothing is reported for it.
    pub fn cancel(&mut self) {
        if let Some(mut stale) = self.current.take() {
            stale.cancel();
            tracing::debug!(session = %stale.id(), "Superseded linter session");
        }
    }

    /// Drain completion events without blocking, up to `budget`.
    ///
    /// Returns the number of events handled (stale ones included).
    pub fn poll_events(&mut self, budget: usize) -> usize {
        let mut count = 0;
        while count < budget {
            match self.event_rx.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                    count += 1;
                }
                Err(mpsc::error::TryRecvError::Empty | mpsc::error::TryRecvError::Disconnected) => {
                    break;
                }
            }
        }
        count
    }

    /// Wait until the current check (if any) has been reported.
    pub async fn wait_idle(&mut self) {
        while self.current.is_some() {
            // The coordinator holds a sender, so `None` never happens.
            let Some(event) = self.event_rx.recv().await else {
                break;
            };
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: SessionEvent) {
        let Some(mut session) = self.current.take_if(|s| s.id() == event.session) else {
            tracing::debug!(session = %event.session, "Discarding result of stale session");
            return;
        };

        match Self::diagnose(&session, event.outcome) {
            Ok(diagnostics) => {
                session.finish(true);
                tracing::debug!(
                    session = %session.id(),
                    count = diagnostics.len(),
                    "Lint finished"
                );
                self.sink.report(diagnostics);
            }
            Err(e) => {
                session.finish(false);
                tracing::warn!(session = %session.id(), "Lint failed: {e}");
                self.sink.report_error(e);
            }
        }
        // Dropping `session` releases its handle.
    }

    /// Turn a finished session's output into diagnostics.
    ///
    /// A non-zero exit is trusted when the output parses: the linter exits
    /// non-zero whenever it finds issues. With nothing on stdout, the exit
    /// status and stderr are the better explanation.
    fn diagnose(
        session: &ProcessSession,
        outcome: Result<ProcessOutput, ProcessError>,
    ) -> Result<Vec<Diagnostic>, CheckError> {
        let output = outcome?;
        if output.exit_code != Some(0) && output.stdout.trim().is_empty() {
            return Err(ProcessError::Exited {
                code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            }
            .into());
        }
        if !output.stderr.trim().is_empty() {
            tracing::debug!(
                session = %session.id(),
                stderr = %output.stderr.trim(),
                "Linter stderr"
            );
        }

        let records = output::parse(&output.stdout)?;
        Ok(position::to_diagnostics(
            session.snapshot(),
            session.encoding(),
            records,
        ))
    }
}
