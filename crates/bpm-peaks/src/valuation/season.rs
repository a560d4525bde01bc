// League-wide renormalization and the playing-time filter for one season.

use tracing::debug;

use crate::source::PlayerSeasonRecord;
use crate::valuation::zscore::{
    compute_zscore, compute_zscore_pool_stats, normalize_by_team, NormalizedRecord, ZScore,
};
use crate::valuation::ValuationError;

/// Players below this percentile of season minutes are dropped.
pub const MINUTES_PERCENTILE: f64 = 70.0;

/// The scored, minutes-filtered players of one season.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonResult {
    pub season: i32,
    pub minutes_threshold: f64,
    pub players: Vec<NormalizedRecord>,
}

/// Linear-interpolation percentile (`rank = p/100 * (N - 1)`).
///
/// Returns `None` for an empty slice.
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    Some(sorted[lower] + frac * (sorted[upper] - sorted[lower]))
}

/// Renormalize team-relative z-scores across the whole league, then keep
/// players at or above the minutes percentile.
///
/// An undefined team z-score anywhere in the pool leaves the league mean
/// undefined, so every league z-score of that season is undefined too.
pub fn aggregate_season(
    season: i32,
    team_scores: Vec<NormalizedRecord>,
) -> Result<SeasonResult, ValuationError> {
    let empty = || ValuationError::EmptyPopulation {
        season,
        group: "league".into(),
    };
    if team_scores.is_empty() {
        return Err(empty());
    }

    let inputs: Vec<ZScore> = team_scores.iter().map(|r| r.z_score).collect();
    let league_stats = compute_zscore_pool_stats(&inputs);
    if league_stats.is_none() {
        debug!(season, "undefined team z-score; league z-scores are undefined");
    }

    let minutes: Vec<f64> = team_scores.iter().map(|r| r.minutes_played).collect();
    let minutes_threshold = percentile(&minutes, MINUTES_PERCENTILE).ok_or_else(empty)?;

    let players: Vec<NormalizedRecord> = team_scores
        .into_iter()
        .filter(|r| r.minutes_played >= minutes_threshold)
        .map(|r| {
            let z_score = match (&league_stats, r.z_score.value()) {
                (Some(stats), Some(value)) => compute_zscore(value, stats),
                _ => ZScore::undefined(),
            };
            NormalizedRecord { z_score, ..r }
        })
        .collect();

    debug!(
        season,
        minutes_threshold,
        kept = players.len(),
        pool = minutes.len(),
        "season aggregated"
    );

    Ok(SeasonResult {
        season,
        minutes_threshold,
        players,
    })
}

/// Team normalization followed by league aggregation.
pub fn score_season(
    season: i32,
    records: &[PlayerSeasonRecord],
) -> Result<SeasonResult, ValuationError> {
    let team_scores = normalize_by_team(season, records)?;
    aggregate_season(season, team_scores)
}
