//! LintManager facade: the multi-buffer entry point for hosts.
//!
//! One [`CheckCoordinator`] per open buffer. Buffers share nothing: each
//! has its own session slot and completion channel. Outcomes are queued
//! per buffer and handed out as [`LintEvent`]s by `poll_events()`.
//!
//! An open buffer is an entry in the map; closing removes it, which kills
//! any linter still running for it.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::coordinator::{CheckCoordinator, CheckState};
use crate::error::CheckError;
use crate::types::{BufferId, Diagnostic, DiagnosticSink, LintConfig};

/// Outcome of one check, tagged with its buffer.
#[derive(Debug)]
pub enum LintEvent {
    /// Full diagnostic set for the buffer, replacing the previous one.
    Diagnostics {
        buffer: BufferId,
        items: Vec<Diagnostic>,
    },
    /// The check failed; the host should surface `error` once.
    Failed { buffer: BufferId, error: CheckError },
}

impl LintEvent {
    #[must_use]
    pub fn buffer(&self) -> &BufferId {
        match self {
            Self::Diagnostics { buffer, .. } | Self::Failed { buffer, .. } => buffer,
        }
    }
}

/// Per-buffer sink that queues outcomes until the manager drains them.
struct Outbox {
    buffer: BufferId,
    queue: Vec<LintEvent>,
}

impl DiagnosticSink for Outbox {
    fn report(&mut self, diagnostics: Vec<Diagnostic>) {
        self.queue.push(LintEvent::Diagnostics {
            buffer: self.buffer.clone(),
            items: diagnostics,
        });
    }

    fn report_error(&mut self, error: CheckError) {
        self.queue.push(LintEvent::Failed {
            buffer: self.buffer.clone(),
            error,
        });
    }
}

/// Public facade for checking many buffers.
pub struct LintManager {
    buffers: BTreeMap<BufferId, CheckCoordinator<Outbox>>,
    default_config: LintConfig,
}

impl LintManager {
    /// `default_config` applies to buffers opened without their own.
    #[must_use]
    pub fn new(default_config: LintConfig) -> Self {
        Self {
            buffers: BTreeMap::new(),
            default_config,
        }
    }

    /// Start tracking a buffer. Re-opening an open buffer only swaps its
    /// configuration.
    pub fn open_buffer(&mut self, buffer: BufferId, config: Option<LintConfig>) {
        let config = config.unwrap_or_else(|| self.default_config.clone());
        if let Some(coordinator) = self.buffers.get_mut(&buffer) {
            coordinator.set_config(config);
            return;
        }
        tracing::debug!(buffer = %buffer, dialect = %config.dialect, "Buffer opened");
        let outbox = Outbox {
            buffer: buffer.clone(),
            queue: Vec::new(),
        };
        self.buffers
            .insert(buffer, CheckCoordinator::new(config, outbox));
    }

    /// Stop tracking a buffer, killing any check in flight. Outcomes not
    /// yet polled are dropped.
    pub fn close_buffer(&mut self, buffer: &BufferId) -> bool {
        match self.buffers.remove(buffer) {
            Some(mut coordinator) => {
                coordinator.cancel();
                tracing::debug!(buffer = %buffer, "Buffer closed");
                true
            }
            None => false,
        }
    }

    /// Check `text` for `buffer`, superseding its previous check.
    ///
    /// Unknown buffers are skipped; returns `None` for them.
    pub fn request_check(
        &mut self,
        buffer: &BufferId,
        text: impl Into<Arc<str>>,
    ) -> Option<CheckState> {
        let Some(coordinator) = self.buffers.get_mut(buffer) else {
            tracing::warn!(buffer = %buffer, "Check requested for a buffer that is not open");
            return None;
        };
        Some(coordinator.request_check(text))
    }

    /// Drain finished checks from every buffer without blocking.
    ///
    /// `budget` bounds the number of completion events handled per call,
    /// across all buffers.
    pub fn poll_events(&mut self, budget: usize) -> Vec<LintEvent> {
        let mut remaining = budget;
        let mut events = Vec::new();
        for coordinator in self.buffers.values_mut() {
            if remaining > 0 {
                remaining -= coordinator.poll_events(remaining);
            }
            // Spawn failures land in the outbox without a channel event.
            events.append(&mut coordinator.sink_mut().queue);
        }
        events
    }

    /// Wait for every buffer's in-flight check and return all outcomes.
    pub async fn wait_idle(&mut self) -> Vec<LintEvent> {
        let mut events = Vec::new();
        for coordinator in self.buffers.values_mut() {
            coordinator.wait_idle().await;
            events.append(&mut coordinator.sink_mut().queue);
        }
        events
    }

    #[must_use]
    pub fn state(&self, buffer: &BufferId) -> Option<CheckState> {
        self.buffers.get(buffer).map(CheckCoordinator::state)
    }

    #[must_use]
    pub fn is_open(&self, buffer: &BufferId) -> bool {
        self.buffers.contains_key(buffer)
    }

    /// Cancel all checks and forget every buffer.
    pub fn shutdown(&mut self) {
        let buffers = std::mem::take(&mut self.buffers);
        for (buffer, mut coordinator) in buffers {
            if matches!(coordinator.state(), CheckState::Checking(_)) {
                tracing::info!(buffer = %buffer, "Canceling lint on shutdown");
            }
            coordinator.cancel();
        }
    }
}
