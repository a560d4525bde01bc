// Configuration loading and parsing (config/ranker.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::fetch::{FinalAttempt, RetryPolicy};
use crate::source::TransportConfig;

/// First season of the league (1946-47).
pub const FIRST_SEASON: i32 = 1947;

const CONFIG_FILE: &str = "ranker.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub seasons: SeasonRange,
    pub retry: RetryConfig,
    pub source: SourceConfig,
}

impl Config {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            backoff_unit: Duration::from_millis(self.retry.backoff_unit_ms),
            final_attempt: self.retry.final_attempt,
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig::new(
            self.source.base_url.clone(),
            Duration::from_secs(self.source.timeout_secs),
        )
    }
}

// ---------------------------------------------------------------------------
// ranker.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire ranker.toml file.
#[derive(Debug, Clone, Deserialize)]
struct RankerFile {
    seasons: SeasonRange,
    retry: RetryConfig,
    source: SourceConfig,
}

/// Inclusive range of season end years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SeasonRange {
    pub start: i32,
    pub end: i32,
}

impl SeasonRange {
    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start..=self.end
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub backoff_unit_ms: u64,
    #[serde(default)]
    pub final_attempt: FinalAttempt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    BasketballReference,
    Csv,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Resolved against the base directory at load time.
    pub csv_dir: PathBuf,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/ranker.toml` relative to `base_dir`.
///
/// This does not copy defaults; prefer `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let file: RankerFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let mut source = file.source;
    source.csv_dir = base_dir.join(&source.csv_dir);

    let config = Config {
        seasons: file.seasons,
        retry: file.retry,
        source,
    };

    validate(&config)?;

    Ok(config)
}

/// Seed `config/ranker.toml` from `defaults/ranker.toml` when it is missing.
///
/// Returns the path written, or `None` when a config file already exists. An
/// existing file is never replaced.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.exists() {
        return Ok(None);
    }

    let default = base_dir.join("defaults").join(CONFIG_FILE);
    let seed_err = |what: &str, e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("{what}: {e}"),
    };

    let mut src = std::fs::File::open(&default).map_err(|_| ConfigError::DefaultsCopyError {
        message: format!(
            "no config/{CONFIG_FILE} or defaults/{CONFIG_FILE} in {}",
            base_dir.display()
        ),
    })?;
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(|e| seed_err("cannot create config/", e))?;
    }

    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => return Err(seed_err(&format!("cannot create {}", target.display()), e)),
    };
    std::io::copy(&mut src, &mut dest)
        .map_err(|e| seed_err(&format!("cannot write {}", target.display()), e))?;

    Ok(Some(target))
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Seeds the config file from defaults before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let seasons = &config.seasons;
    if seasons.start < FIRST_SEASON {
        return Err(ConfigError::ValidationError {
            field: "seasons.start".into(),
            message: format!("must be >= {FIRST_SEASON}, got {}", seasons.start),
        });
    }
    if seasons.end < seasons.start {
        return Err(ConfigError::ValidationError {
            field: "seasons.end".into(),
            message: format!(
                "must be >= seasons.start ({}), got {}",
                seasons.start, seasons.end
            ),
        });
    }

    if config.retry.backoff_unit_ms == 0 {
        return Err(ConfigError::ValidationError {
            field: "retry.backoff_unit_ms".into(),
            message: "must be > 0".into(),
        });
    }

    let source = &config.source;
    if source.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "source.timeout_secs".into(),
            message: "must be > 0".into(),
        });
    }
    if source.kind == SourceKind::BasketballReference && source.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "source.base_url".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
