// Valuation engine: team z-scores, league renormalization, cumulative ranking.

pub mod ranker;
pub mod season;
pub mod zscore;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValuationError {
    /// A z-score pool with no players. The mean is undefined, so the season
    /// cannot be scored at all.
    #[error("season {season}: {group} has no players")]
    EmptyPopulation { season: i32, group: String },
}
