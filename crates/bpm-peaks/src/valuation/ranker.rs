// Multi-season accumulation with a per-player "beat your own average" cut.

use std::collections::HashMap;

use crate::valuation::season::SeasonResult;
use crate::valuation::zscore::ZScore;

// ---------------------------------------------------------------------------
// Accumulators
// ---------------------------------------------------------------------------

/// Every qualifying season score seen so far for one player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerAccumulator {
    pub name: String,
    scores: Vec<ZScore>,
    seasons: usize,
}

impl PlayerAccumulator {
    fn new(name: String) -> Self {
        Self {
            name,
            scores: Vec::new(),
            seasons: 0,
        }
    }

    fn push(&mut self, score: ZScore) {
        self.scores.push(score);
        self.seasons += 1;
    }

    pub fn scores(&self) -> &[ZScore] {
        &self.scores
    }

    pub fn seasons(&self) -> usize {
        self.seasons
    }

    /// Mean over all counted seasons; undefined if any season is.
    pub fn mean(&self) -> Option<f64> {
        if self.seasons == 0 {
            return None;
        }
        let mut total = 0.0;
        for score in &self.scores {
            total += score.value()?;
        }
        Some(total / self.seasons as f64)
    }

    /// Sum of the seasons strictly above the player's own mean.
    ///
    /// Nothing is strictly above an undefined mean, so a player with any
    /// undefined season scores 0.0. A single-season player also scores 0.0.
    /// The fold starts from `+0.0`: `f64::sum` over nothing yields `-0.0`.
    pub fn cumulative(&self) -> f64 {
        let Some(mean) = self.mean() else {
            return 0.0;
        };
        self.scores
            .iter()
            .filter_map(|z| z.value())
            .filter(|&z| z > mean)
            .fold(0.0, |total, z| total + z)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeScore {
    pub name: String,
    pub score: f64,
}

// ---------------------------------------------------------------------------
// CumulativeRanker
// ---------------------------------------------------------------------------

/// Running per-player accumulators across a season range.
///
/// Players are kept in the order they first qualified; that order breaks ties
/// in the final leaderboard.
#[derive(Debug, Default)]
pub struct CumulativeRanker {
    players: Vec<PlayerAccumulator>,
    index: HashMap<String, usize>,
    last_season: Option<i32>,
}

impl CumulativeRanker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one season's qualifying players into the accumulators.
    ///
    /// Seasons must arrive in strictly ascending order.
    pub fn add_season(&mut self, result: &SeasonResult) {
        debug_assert!(
            self.last_season.map_or(true, |prev| prev < result.season),
            "seasons must be added in ascending order"
        );
        self.last_season = Some(result.season);

        for player in &result.players {
            let idx = match self.index.get(&player.name) {
                Some(&idx) => idx,
                None => {
                    self.players.push(PlayerAccumulator::new(player.name.clone()));
                    let idx = self.players.len() - 1;
                    self.index.insert(player.name.clone(), idx);
                    idx
                }
            };
            self.players[idx].push(player.z_score);
        }
    }

    pub fn accumulator(&self, name: &str) -> Option<&PlayerAccumulator> {
        self.index.get(name).map(|&idx| &self.players[idx])
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Reduce every accumulator to its cumulative score, in first-seen order.
    pub fn finish(self) -> Vec<CumulativeScore> {
        self.players
            .into_iter()
            .map(|acc| CumulativeScore {
                score: acc.cumulative(),
                name: acc.name,
            })
            .collect()
    }
}
