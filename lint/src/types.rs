//! Public types consumed by the host.
//!
//! These types define the interface between `fluffcheck-lint` and whatever
//! editor embeds it. The host constructs a [`LintConfig`], implements
//! [`DiagnosticSink`], and receives finished [`Diagnostic`]s.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::CheckError;

/// Default linter executable, resolved through `PATH`.
pub const DEFAULT_EXECUTABLE: &str = "sqlfluff";

/// SQL grammar variant the linter parses against.
///
/// The set mirrors the dialects sqlfluff ships. Unknown names are rejected
/// here, at the configuration boundary, never by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Dialect {
    #[default]
    Ansi,
    Athena,
    Bigquery,
    Clickhouse,
    Databricks,
    Db2,
    Duckdb,
    Exasol,
    Greenplum,
    Hive,
    Materialize,
    Mysql,
    Oracle,
    Postgres,
    Redshift,
    Snowflake,
    Soql,
    Sparksql,
    Sqlite,
    Teradata,
    Trino,
    Tsql,
}

impl Dialect {
    pub const ALL: [Dialect; 22] = [
        Self::Ansi,
        Self::Athena,
        Self::Bigquery,
        Self::Clickhouse,
        Self::Databricks,
        Self::Db2,
        Self::Duckdb,
        Self::Exasol,
        Self::Greenplum,
        Self::Hive,
        Self::Materialize,
        Self::Mysql,
        Self::Oracle,
        Self::Postgres,
        Self::Redshift,
        Self::Snowflake,
        Self::Soql,
        Self::Sparksql,
        Self::Sqlite,
        Self::Teradata,
        Self::Trino,
        Self::Tsql,
    ];

    /// Name passed to `--dialect`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ansi => "ansi",
            Self::Athena => "athena",
            Self::Bigquery => "bigquery",
            Self::Clickhouse => "clickhouse",
            Self::Databricks => "databricks",
            Self::Db2 => "db2",
            Self::Duckdb => "duckdb",
            Self::Exasol => "exasol",
            Self::Greenplum => "greenplum",
            Self::Hive => "hive",
            Self::Materialize => "materialize",
            Self::Mysql => "mysql",
            Self::Oracle => "oracle",
            Self::Postgres => "postgres",
            Self::Redshift => "redshift",
            Self::Snowflake => "snowflake",
            Self::Soql => "soql",
            Self::Sparksql => "sparksql",
            Self::Sqlite => "sqlite",
            Self::Teradata => "teradata",
            Self::Trino => "trino",
            Self::Tsql => "tsql",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown SQL dialect '{0}'")]
pub struct UnknownDialect(String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == wanted)
            .ok_or_else(|| UnknownDialect(s.to_string()))
    }
}

impl TryFrom<String> for Dialect {
    type Error = UnknownDialect;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Unit the host uses to address text.
///
/// The linter counts columns in characters; hosts differ (byte offsets for
/// Rust strings, UTF-16 code units for LSP-style clients, characters for
/// most editors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum PositionEncoding {
    Utf8,
    Utf16,
    #[default]
    Char,
}

impl FromStr for PositionEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" | "byte" => Ok(Self::Utf8),
            "utf16" | "utf-16" => Ok(Self::Utf16),
            "char" => Ok(Self::Char),
            other => Err(format!("unknown position encoding '{other}'")),
        }
    }
}

impl TryFrom<String> for PositionEncoding {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

fn default_executable() -> String {
    DEFAULT_EXECUTABLE.to_string()
}

/// Per-buffer linter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LintConfig {
    /// Executable command (e.g. "sqlfluff"). Resolved through `PATH`.
    #[serde(default = "default_executable")]
    pub executable: String,
    /// Arguments placed before the `lint` subcommand, for wrappers such as
    /// `python -m sqlfluff`.
    #[serde(default)]
    pub launcher_args: Vec<String>,
    /// Additional linter flags appended after the fixed ones.
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default)]
    pub dialect: Dialect,
    /// Offset unit of reported ranges.
    #[serde(default)]
    pub encoding: PositionEncoding,
    /// Kill the linter if it runs longer than this.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            launcher_args: Vec::new(),
            extra_args: Vec::new(),
            dialect: Dialect::default(),
            encoding: PositionEncoding::default(),
            timeout_secs: None,
        }
    }
}

impl LintConfig {
    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Severity level for a diagnostic.
///
/// The linter's annotation format does not distinguish severities yet, so
/// every issue is a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Severity {
    Warning,
}

impl Severity {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Warning => "warning",
        }
    }
}

/// One issue as emitted by the linter, positions still in line/column form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// 1-indexed line number.
    pub line: u32,
    /// 1-indexed column of the first character.
    pub start_column: u32,
    /// 1-indexed column one past the last character.
    pub end_column: u32,
    pub message: String,
    pub severity: Severity,
}

/// Half-open `[start, end)` span in the host's offset unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A finished diagnostic handed to the host.
///
/// Fields are private; construction happens at the mapping boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    range: TextRange,
    severity: Severity,
    message: String,
    /// Line/column as reported by the linter, kept for display.
    line: u32,
    column: u32,
}

impl Diagnostic {
    #[must_use]
    pub fn new(
        range: TextRange,
        severity: Severity,
        message: String,
        line: u32,
        column: u32,
    ) -> Self {
        Self {
            range,
            severity,
            message,
            line,
            column,
        }
    }

    #[must_use]
    pub fn range(&self) -> TextRange {
        self.range
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 1-indexed line as reported by the linter.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// 1-indexed column as reported by the linter.
    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Format as `path:line:col: severity: message`.
    #[must_use]
    pub fn display_with_path(&self, path: &str) -> String {
        format!(
            "{path}:{}:{}: {}: {}",
            self.line,
            self.column,
            self.severity.label(),
            self.message,
        )
    }
}

/// Host callback receiving the outcome of each check.
///
/// Exactly one of the two methods is called per check that is not
/// superseded. Superseded checks call neither.
pub trait DiagnosticSink {
    /// The full diagnostic set for the buffer, replacing any earlier one.
    fn report(&mut self, diagnostics: Vec<Diagnostic>);

    /// The check failed; the previous diagnostics are stale but no new
    /// set is available.
    fn report_error(&mut self, error: CheckError);
}

/// Identifies a host buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(String);

impl BufferId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
