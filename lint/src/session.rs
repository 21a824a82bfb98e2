//! Session handle: owns one linter process from spawn to exit.
//!
//! `start()` returns as soon as the child is spawned. A background task
//! feeds the buffer text to stdin, collects stdout/stderr until exit and
//! posts exactly one [`SessionEvent`]. Canceled sessions post nothing.

use std::io;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

use crate::error::{ProcessError, SpawnError};
use crate::output::OUTPUT_FORMAT;
use crate::process;
use crate::types::{LintConfig, PositionEncoding};

/// Monotonic per-buffer session identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub(crate) u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
    Canceled,
}

impl SessionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self != Self::Running
    }
}

/// Everything the linter produced, available only after it exited.
#[derive(Debug)]
pub struct ProcessOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Completion notice for one session.
#[derive(Debug)]
pub struct SessionEvent {
    pub session: SessionId,
    pub outcome: Result<ProcessOutput, ProcessError>,
}

/// Arguments after the executable name.
pub(crate) fn build_args(config: &LintConfig) -> Vec<String> {
    let mut args = config.launcher_args.clone();
    args.extend(
        [
            "lint",
            "--dialect",
            config.dialect.as_str(),
            "--format",
            OUTPUT_FORMAT,
            "--disable-progress-bar",
        ]
        .map(String::from),
    );
    args.extend(config.extra_args.iter().cloned());
    // Read the SQL from stdin; no temp file.
    args.push(String::from("-"));
    args
}

pub struct ProcessSession {
    id: SessionId,
    snapshot: Arc<str>,
    encoding: PositionEncoding,
    status: SessionStatus,
    /// Dropping this (or sending on it) kills the process.
    cancel_tx: Option<oneshot::Sender<()>>,
    #[allow(dead_code)]
    task: tokio::task::JoinHandle<()>,
}

impl ProcessSession {
    /// Spawn the linter for `snapshot` and return immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        id: SessionId,
        config: &LintConfig,
        snapshot: Arc<str>,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Self, SpawnError> {
        let resolved =
            which::which(&config.executable).map_err(|source| SpawnError::NotFound {
                executable: config.executable.clone(),
                source,
            })?;

        let mut cmd = Command::new(&resolved);
        cmd.args(build_args(config))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        process::set_new_session(&mut cmd);

        let child = cmd.spawn().map_err(|source| SpawnError::Launch {
            executable: config.executable.clone(),
            source,
        })?;

        tracing::info!(
            session = %id,
            pid = child.id(),
            dialect = %config.dialect,
            bytes = snapshot.len(),
            "Started {}",
            resolved.display()
        );

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(Self::supervise(
            id,
            child,
            Arc::clone(&snapshot),
            config.timeout(),
            cancel_rx,
            events,
        ));

        Ok(Self {
            id,
            snapshot,
            encoding: config.encoding,
            status: SessionStatus::Running,
            cancel_tx: Some(cancel_tx),
            task,
        })
    }

    async fn supervise(
        id: SessionId,
        mut child: Child,
        input: Arc<str>,
        timeout: Option<Duration>,
        cancel_rx: oneshot::Receiver<()>,
        events: mpsc::Sender<SessionEvent>,
    ) {
        let outcome = tokio::select! {
            biased;
            _ = cancel_rx => {
                process::terminate(&mut child).await;
                tracing::debug!(session = %id, "Linter process canceled");
                return;
            }
            outcome = run_with_timeout(&mut child, input, timeout) => outcome,
        };

        if outcome.is_err() {
            process::terminate(&mut child).await;
        }

        if events.send(SessionEvent { session: id, outcome }).await.is_err() {
            tracing::debug!(session = %id, "Session finished after its buffer closed");
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The exact text that was sent to the linter.
    #[must_use]
    pub fn snapshot(&self) -> &str {
        &self.snapshot
    }

    /// Offset unit the snapshot's diagnostics are mapped into.
    #[must_use]
    pub fn encoding(&self) -> PositionEncoding {
        self.encoding
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Record the terminal state observed through this session's event.
    pub(crate) fn finish(&mut self, succeeded: bool) {
        if self.status == SessionStatus::Running {
            self.status = if succeeded {
                SessionStatus::Completed
            } else {
                SessionStatus::Failed
            };
        }
        self.cancel_tx = None;
    }

    /// Kill the process and discard anything it produced.
    ///
    /// Idempotent; a no-op once the session reached a terminal state.
    pub fn cancel(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        if let Some(tx) = self.cancel_tx.take() {
            // Err means the task already finished; its event will be
            // discarded by the coordinator.
            let _ = tx.send(());
        }
        self.status = SessionStatus::Canceled;
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_with_timeout(
    child: &mut Child,
    input: Arc<str>,
    timeout: Option<Duration>,
) -> Result<ProcessOutput, ProcessError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, run_to_exit(child, input))
            .await
            .unwrap_or(Err(ProcessError::Timeout(limit))),
        None => run_to_exit(child, input).await,
    }
}

/// Write `input`, close stdin, and collect all output until exit.
///
/// Reading runs concurrently with writing so a large buffer can't fill the
/// pipes and deadlock.
async fn run_to_exit(child: &mut Child, input: Arc<str>) -> Result<ProcessOutput, ProcessError> {
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| io::Error::other("linter stdin not captured"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("linter stdout not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("linter stderr not captured"))?;

    let write = async move {
        let result = stdin.write_all(input.as_bytes()).await;
        // Closing stdin is the end-of-input signal.
        drop(stdin);
        match result {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!("Linter closed stdin before reading all input");
                Ok(())
            }
            other => other,
        }
    };

    let (written, stdout, stderr) = tokio::join!(write, read_all(stdout), read_all(stderr));
    written?;
    let stdout = stdout?;
    let stderr = stderr?;

    let status = child.wait().await?;
    Ok(ProcessOutput {
        exit_code: status.code(),
        stdout,
        stderr,
    })
}

async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> io::Result<String> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
