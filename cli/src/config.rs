//! `~/.fluffcheck/config.toml` loading.
//!
//! ```toml
//! [lint]
//! executable = "sqlfluff"
//! dialect = "postgres"
//! encoding = "char"
//! timeout_secs = 30
//! ```

use std::path::{Path, PathBuf};
use std::{env, fs};

use fluffcheck_lint::{Dialect, LintConfig};
use serde::Deserialize;

/// Environment variable overriding the configured dialect.
pub const DIALECT_ENV: &str = "FLUFFCHECK_DIALECT";

#[derive(Debug, Default, Deserialize)]
pub struct FluffcheckConfig {
    pub lint: Option<LintConfig>,
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

impl FluffcheckConfig {
    /// Load the config from its default location. A missing file is not
    /// an error.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// The `[lint]` table with the dialect env override applied.
    #[must_use]
    pub fn into_lint_config(self) -> LintConfig {
        let mut lint = self.lint.unwrap_or_default();
        if let Some(dialect) = dialect_from_env() {
            lint.dialect = dialect;
        }
        lint
    }
}

fn dialect_from_env() -> Option<Dialect> {
    let value = env::var(DIALECT_ENV).ok()?;
    match value.parse() {
        Ok(dialect) => Some(dialect),
        Err(err) => {
            tracing::warn!("Ignoring {DIALECT_ENV}: {err}");
            None
        }
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".fluffcheck").join("config.toml"))
}
