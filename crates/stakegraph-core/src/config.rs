use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ErrorCode;

/// Directory holding the project config and the default store file.
pub const PROJECT_DIR: &str = ".stakegraph";

/// Environment variable that overrides the configured connection url.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub paging: PagingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PagingConfig {
    /// Applied to list commands when no explicit `--limit` is given.
    #[serde(default)]
    pub default_limit: Option<u32>,
}

/// Fully resolved configuration for one process.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub location: StoreLocation,
}

// ---------------------------------------------------------------------------
// Connection url
// ---------------------------------------------------------------------------

/// Configuration errors that are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The connection url does not name a SQLite store.
    #[error("invalid database connection url received: '{url}'")]
    InvalidConnection { url: String },
}

impl ConfigError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidConnection { .. } => ErrorCode::InvalidConnection,
        }
    }
}

/// Where the store lives, parsed from a `sqlite:` connection url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
}

impl StoreLocation {
    /// Anchor a relative file path at `root`.
    #[must_use]
    pub fn relative_to(self, root: &Path) -> Self {
        match self {
            Self::File(path) if path.is_relative() => Self::File(root.join(path)),
            other => other,
        }
    }
}

impl FromStr for StoreLocation {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let url = s.trim();
        if url == "sqlite::memory:" || url == "sqlite://:memory:" {
            return Ok(Self::Memory);
        }

        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .filter(|rest| !rest.trim().is_empty() && !rest.starts_with(':'))
            .ok_or_else(|| ConfigError::InvalidConnection {
                url: s.to_string(),
            })?;

        Ok(Self::File(PathBuf::from(path)))
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("sqlite::memory:"),
            Self::File(path) => write!(f, "sqlite:{}", path.display()),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Path of the project config file under `project_root`.
#[must_use]
pub fn config_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_DIR).join("config.toml")
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Resolve the project config and the store location.
///
/// Connection url precedence (highest wins):
/// 1. `cli_url` (`--db`)
/// 2. `DATABASE_URL`
/// 3. `[store] database_url` in `.stakegraph/config.toml`
///
/// # Errors
///
/// Returns an error if the config file cannot be parsed, or
/// [`ConfigError::InvalidConnection`] if the winning url is malformed.
pub fn resolve_config(project_root: &Path, cli_url: Option<&str>) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let env_url = env::var(DATABASE_URL_ENV).ok();
    let url = resolve_database_url(cli_url, env_url.as_deref(), &project.store.database_url);

    let location = url.parse::<StoreLocation>()?.relative_to(project_root);
    tracing::debug!(%location, "resolved store location");

    Ok(EffectiveConfig { project, location })
}

fn resolve_database_url<'a>(
    cli_url: Option<&'a str>,
    env_url: Option<&'a str>,
    file_url: &'a str,
) -> &'a str {
    cli_url
        .or_else(|| env_url.filter(|url| !url.trim().is_empty()))
        .unwrap_or(file_url)
}

fn default_database_url() -> String {
    format!("sqlite:{PROJECT_DIR}/stakegraph.db")
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}
