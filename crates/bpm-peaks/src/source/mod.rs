// Season data sources: the upstream provider of per-player advanced stats.
//
// The pipeline only depends on the `SeasonSource` trait. Two implementations
// ship with the crate: a basketball-reference scraper and an offline CSV
// directory reader.

pub mod bbref;
pub mod csv_file;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{Config, SourceKind};

pub use bbref::{BasketballReference, TransportConfig, BROWSER_USER_AGENT};
pub use csv_file::CsvSeasonSource;

/// HTTP status returned by the upstream when it throttles us.
pub const RATE_LIMITED_STATUS: u16 = 429;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One player's advanced totals for one team in one season.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSeasonRecord {
    pub name: String,
    pub team: String,
    pub box_plus_minus: f64,
    pub minutes_played: f64,
}

impl PlayerSeasonRecord {
    pub fn new(
        name: impl Into<String>,
        team: impl Into<String>,
        box_plus_minus: f64,
        minutes_played: f64,
    ) -> Self {
        Self {
            name: name.into(),
            team: team.into(),
            box_plus_minus,
            minutes_played,
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("rate limited while fetching season {season} (HTTP {status})")]
    RateLimited { season: i32, status: u16 },

    #[error("HTTP {status} while fetching season {season}")]
    Http { season: i32, status: u16 },

    #[error("request for season {season} failed: {source}")]
    Transport {
        season: i32,
        source: reqwest::Error,
    },

    #[error("failed to parse season {season}: {message}")]
    Parse { season: i32, message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

impl SourceError {
    /// True for the transient throttling failure that callers may retry.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SourceError::RateLimited { .. })
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Provider of one season's per-player advanced statistics.
#[async_trait]
pub trait SeasonSource {
    /// Fetch every player record for the season ending in `season_end_year`.
    async fn fetch_season(
        &self,
        season_end_year: i32,
    ) -> Result<Vec<PlayerSeasonRecord>, SourceError>;
}

// ---------------------------------------------------------------------------
// ConfiguredSource wrapper
// ---------------------------------------------------------------------------

/// The source selected by `[source].kind` in the config.
pub enum ConfiguredSource {
    /// Live scraping of basketball-reference.com.
    Remote(BasketballReference),
    /// Season exports read from a local directory.
    Csv(CsvSeasonSource),
}

impl ConfiguredSource {
    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        Ok(match config.source.kind {
            SourceKind::BasketballReference => {
                ConfiguredSource::Remote(BasketballReference::new(config.transport())?)
            }
            SourceKind::Csv => ConfiguredSource::Csv(CsvSeasonSource::new(&config.source.csv_dir)),
        })
    }

    pub fn describe(&self) -> &'static str {
        match self {
            ConfiguredSource::Remote(_) => "basketball-reference.com",
            ConfiguredSource::Csv(_) => "local CSV exports",
        }
    }
}

#[async_trait]
impl SeasonSource for ConfiguredSource {
    async fn fetch_season(
        &self,
        season_end_year: i32,
    ) -> Result<Vec<PlayerSeasonRecord>, SourceError> {
        match self {
            ConfiguredSource::Remote(source) => source.fetch_season(season_end_year).await,
            ConfiguredSource::Csv(source) => source.fetch_season(season_end_year).await,
        }
    }
}
