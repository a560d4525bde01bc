// Population z-scores and the team-relative normalization pass.

use std::collections::HashMap;

use crate::source::PlayerSeasonRecord;
use crate::valuation::ValuationError;

// ---------------------------------------------------------------------------
// ZScore
// ---------------------------------------------------------------------------

/// A z-score that may be undefined.
///
/// A pool whose standard deviation is zero has no meaningful z-scores. Rather
/// than let NaN leak through arithmetic, the undefined case is explicit and
/// every consumer has to decide what it means.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScore(Option<f64>);

impl ZScore {
    pub fn new(value: f64) -> Self {
        ZScore(Some(value))
    }

    pub fn undefined() -> Self {
        ZScore(None)
    }

    pub fn value(self) -> Option<f64> {
        self.0
    }

    pub fn is_defined(self) -> bool {
        self.0.is_some()
    }
}

// ---------------------------------------------------------------------------
// Pool statistics
// ---------------------------------------------------------------------------

/// Mean and standard deviation of one statistic across a player pool.
#[derive(Debug, Clone, Copy)]
pub struct PoolStats {
    pub mean: f64,
    pub stdev: f64,
}

/// Threshold below which standard deviation is treated as zero.
pub const STDEV_EPSILON: f64 = 1e-9;

/// Compute mean and standard deviation for a slice of values.
///
/// Returns `PoolStats { mean: 0.0, stdev: 0.0 }` for an empty slice.
/// Uses the population standard deviation (N denominator): a team or a league
/// season is the whole population, not a sample of it.
pub fn compute_pool_stats(values: &[f64]) -> PoolStats {
    if values.is_empty() {
        return PoolStats {
            mean: 0.0,
            stdev: 0.0,
        };
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    PoolStats {
        mean,
        stdev: variance.sqrt(),
    }
}

/// Pool stats over z-scores from an earlier pass. `None` if any input is
/// undefined, since the mean of the pool is then undefined as well.
pub fn compute_zscore_pool_stats(values: &[ZScore]) -> Option<PoolStats> {
    let defined: Option<Vec<f64>> = values.iter().map(|z| z.value()).collect();
    defined.map(|v| compute_pool_stats(&v))
}

/// Compute a z-score given a value and pool stats.
///
/// Undefined if the standard deviation is approximately zero.
pub fn compute_zscore(value: f64, stats: &PoolStats) -> ZScore {
    if stats.stdev < STDEV_EPSILON {
        return ZScore::undefined();
    }
    ZScore::new((value - stats.mean) / stats.stdev)
}

// ---------------------------------------------------------------------------
// Team normalization
// ---------------------------------------------------------------------------

/// A player's z-score for one season alongside the minutes that earned it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub name: String,
    pub z_score: ZScore,
    pub minutes_played: f64,
}

/// Z-score every player's BPM against their own team's roster.
///
/// Teams are emitted in the order they first appear and players keep their
/// input order within a team. A team with zero BPM variance yields undefined
/// z-scores for all of its players.
pub fn normalize_by_team(
    season: i32,
    records: &[PlayerSeasonRecord],
) -> Result<Vec<NormalizedRecord>, ValuationError> {
    if records.is_empty() {
        return Err(ValuationError::EmptyPopulation {
            season,
            group: "league".into(),
        });
    }

    let mut team_index: HashMap<&str, usize> = HashMap::new();
    let mut teams: Vec<Vec<&PlayerSeasonRecord>> = Vec::new();
    for record in records {
        let idx = *team_index.entry(record.team.as_str()).or_insert_with(|| {
            teams.push(Vec::new());
            teams.len() - 1
        });
        teams[idx].push(record);
    }

    let mut normalized = Vec::with_capacity(records.len());
    for roster in &teams {
        let bpm: Vec<f64> = roster.iter().map(|r| r.box_plus_minus).collect();
        let stats = compute_pool_stats(&bpm);
        for record in roster {
            normalized.push(NormalizedRecord {
                name: record.name.clone(),
                z_score: compute_zscore(record.box_plus_minus, &stats),
                minutes_played: record.minutes_played,
            });
        }
    }

    Ok(normalized)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
