// Offline season source: one CSV file per season in a directory.
//
// File layout: `{dir}/{season_end_year}.csv` with the columns
// `name,team,box_plus_minus,minutes_played`. Extra columns are ignored.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{PlayerSeasonRecord, SeasonSource, SourceError};

#[derive(Debug, Deserialize)]
struct RawSeasonRow {
    name: String,
    team: String,
    #[serde(alias = "bpm")]
    box_plus_minus: f64,
    #[serde(alias = "mp")]
    minutes_played: f64,
    /// Absorb any extra columns an export includes.
    #[serde(flatten)]
    _extra: HashMap<String, serde_json::Value>,
}

/// Reads exported season tables from disk.
#[derive(Debug, Clone)]
pub struct CsvSeasonSource {
    dir: PathBuf,
}

impl CsvSeasonSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn season_path(&self, season_end_year: i32) -> PathBuf {
        self.dir.join(format!("{season_end_year}.csv"))
    }
}

#[async_trait]
impl SeasonSource for CsvSeasonSource {
    async fn fetch_season(
        &self,
        season_end_year: i32,
    ) -> Result<Vec<PlayerSeasonRecord>, SourceError> {
        let path = self.season_path(season_end_year);
        debug!(season = season_end_year, path = %path.display(), "reading season file");
        load_season_file(&path)
    }
}

/// Load one season file.
pub fn load_season_file(path: &Path) -> Result<Vec<PlayerSeasonRecord>, SourceError> {
    let file = std::fs::File::open(path).map_err(|e| SourceError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_season_from_reader(file).map_err(|e| SourceError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

fn load_season_from_reader<R: Read>(rdr: R) -> Result<Vec<PlayerSeasonRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut records = Vec::new();
    for result in reader.deserialize::<RawSeasonRow>() {
        match result {
            Ok(raw) => {
                if !raw.box_plus_minus.is_finite() || !raw.minutes_played.is_finite() {
                    warn!("skipping '{}': non-finite bpm or minutes", raw.name.trim());
                    continue;
                }
                records.push(PlayerSeasonRecord {
                    name: raw.name.trim().to_string(),
                    team: raw.team.trim().to_string(),
                    box_plus_minus: raw.box_plus_minus,
                    minutes_played: raw.minutes_played,
                });
            }
            Err(e) => {
                warn!("skipping malformed season row: {}", e);
            }
        }
    }
    Ok(records)
}
