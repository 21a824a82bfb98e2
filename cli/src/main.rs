//! fluffcheck CLI - one-shot sqlfluff checks with editor-style output.
//!
//! ```text
//! main() -> load config -> CheckCoordinator::request_check() -> wait_idle()
//!                                                                   |
//!                                                                   v
//!                                                  Report::Diagnostics | Report::Failed
//! ```
//!
//! Exit status: 0 when clean, 1 when diagnostics were reported, 2 when the
//! check itself failed.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::io::AsyncReadExt;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use fluffcheck_lint::{
    CheckCoordinator, CheckError, Diagnostic, DiagnosticSink, Dialect, LintConfig,
    PositionEncoding,
};

use crate::config::FluffcheckConfig;

#[derive(Debug, Parser)]
#[command(name = "fluffcheck", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Lint a SQL file (or stdin) and print its diagnostics.
    Check(CheckArgs),
    /// List the supported SQL dialects.
    Dialects,
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// File to lint; `-` reads standard input.
    #[arg(default_value = "-")]
    path: PathBuf,
    /// SQL dialect (overrides config and FLUFFCHECK_DIALECT).
    #[arg(long)]
    dialect: Option<Dialect>,
    /// Linter executable.
    #[arg(long)]
    executable: Option<String>,
    /// Offset unit of the reported ranges (utf8, utf16, char).
    #[arg(long)]
    encoding: Option<PositionEncoding>,
    /// Kill the linter after this many seconds.
    #[arg(long)]
    timeout: Option<u64>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// `path:line:col: warning: message`
    Text,
    /// JSON array with host ranges.
    Json,
}

/// What the coordinator handed back for the single check.
#[derive(Debug, Default)]
enum Report {
    #[default]
    Pending,
    Diagnostics(Vec<Diagnostic>),
    Failed(CheckError),
}

impl DiagnosticSink for Report {
    fn report(&mut self, diagnostics: Vec<Diagnostic>) {
        *self = Report::Diagnostics(diagnostics);
    }

    fn report_error(&mut self, error: CheckError) {
        *self = Report::Failed(error);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("error"));

    // stdout carries diagnostics; logs go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn resolve_config(args: &CheckArgs) -> LintConfig {
    let mut config = match FluffcheckConfig::load() {
        Ok(Some(loaded)) => loaded.into_lint_config(),
        Ok(None) => FluffcheckConfig::default().into_lint_config(),
        Err(e) => {
            eprintln!("Warning: {e}; using defaults");
            FluffcheckConfig::default().into_lint_config()
        }
    };

    if let Some(dialect) = args.dialect {
        config.dialect = dialect;
    }
    if let Some(executable) = &args.executable {
        config.executable.clone_from(executable);
    }
    if let Some(encoding) = args.encoding {
        config.encoding = encoding;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = Some(timeout);
    }
    config
}

async fn read_input(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("reading SQL from stdin")?;
        return Ok(text);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}

fn display_name(path: &PathBuf) -> String {
    if path.as_os_str() == "-" {
        String::from("stdin")
    } else {
        path.display().to_string()
    }
}

fn render_json(diagnostics: &[Diagnostic]) -> Result<String> {
    let items: Vec<serde_json::Value> = diagnostics
        .iter()
        .map(|d| {
            serde_json::json!({
                "line": d.line(),
                "column": d.column(),
                "start": d.range().start,
                "end": d.range().end,
                "severity": d.severity().label(),
                "message": d.message(),
            })
        })
        .collect();
    serde_json::to_string_pretty(&items).context("serializing diagnostics")
}

async fn run_check(args: CheckArgs) -> Result<ExitCode> {
    let config = resolve_config(&args);
    let text = read_input(&args.path).await?;
    tracing::debug!(dialect = %config.dialect, executable = %config.executable, "Checking");

    let mut coordinator = CheckCoordinator::new(config, Report::default());
    coordinator.request_check(text);
    coordinator.wait_idle().await;

    let name = display_name(&args.path);
    match std::mem::take(coordinator.sink_mut()) {
        Report::Diagnostics(diagnostics) => {
            match args.format {
                OutputFormat::Text => {
                    for diagnostic in &diagnostics {
                        println!("{}", diagnostic.display_with_path(&name));
                    }
                }
                OutputFormat::Json => println!("{}", render_json(&diagnostics)?),
            }
            Ok(if diagnostics.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Report::Failed(error) => {
            eprintln!("Error: {:#}", anyhow::Error::new(error));
            Ok(ExitCode::from(2))
        }
        Report::Pending => {
            eprintln!("Error: check for {name} finished without a result");
            Ok(ExitCode::from(2))
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Check(args) => run_check(args).await,
        Command::Dialects => {
            for dialect in Dialect::ALL {
                println!("{dialect}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
