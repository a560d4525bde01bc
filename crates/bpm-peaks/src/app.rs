// Season loop orchestration.
//
// Walks the configured season range in ascending order, scores each season
// through the retrying fetcher, folds the survivors into the cumulative
// ranker, and writes the leaderboard. Any season error ends the run.

use std::io::Write;

use anyhow::Context;
use tracing::{info, warn};

use crate::config::SeasonRange;
use crate::fetch::{RetryingSeasonFetcher, SeasonError};
use crate::report;
use crate::source::SeasonSource;
use crate::valuation::ranker::{CumulativeRanker, CumulativeScore};

/// Score every season in `seasons` and reduce to one cumulative score per
/// player, in the order players first qualified.
pub async fn rank_seasons<S: SeasonSource>(
    seasons: SeasonRange,
    fetcher: &RetryingSeasonFetcher<S>,
    out: &mut dyn Write,
) -> Result<Vec<CumulativeScore>, SeasonError> {
    let mut ranker = CumulativeRanker::new();

    for year in seasons.years() {
        let result = fetcher.fetch(year, out).await?;
        info!(
            season = year,
            qualified = result.players.len(),
            minutes_threshold = result.minutes_threshold,
            "season scored"
        );
        ranker.add_season(&result);
    }

    if ranker.is_empty() {
        warn!(
            start = seasons.start,
            end = seasons.end,
            "no player qualified in any season"
        );
    }
    info!(players = ranker.len(), "all seasons accumulated");
    Ok(ranker.finish())
}

/// Full run: progress lines, then the top `report::TOP_N` leaderboard.
pub async fn run<S: SeasonSource>(
    seasons: SeasonRange,
    fetcher: &RetryingSeasonFetcher<S>,
    out: &mut dyn Write,
) -> anyhow::Result<Vec<CumulativeScore>> {
    let scores = rank_seasons(seasons, fetcher, out)
        .await
        .with_context(|| format!("ranking seasons {}-{} failed", seasons.start, seasons.end))?;

    report::write_top(out, &scores, report::TOP_N).context("failed to write leaderboard")?;
    out.flush().context("failed to flush output")?;
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FinalAttempt, RetryPolicy};
    use crate::source::{PlayerSeasonRecord, SourceError};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Fixed records per season; a missing season is an upstream 404.
    struct FixtureSource {
        seasons: HashMap<i32, Vec<PlayerSeasonRecord>>,
    }

    #[async_trait]
    impl SeasonSource for FixtureSource {
        async fn fetch_season(&self, season: i32) -> Result<Vec<PlayerSeasonRecord>, SourceError> {
            self.seasons
                .get(&season)
                .cloned()
                .ok_or(SourceError::Http { season, status: 404 })
        }
    }

    /// Two teams of two with equal minutes; each team's better player
    /// gets a team z-score of +1 and the other -1.
    fn season(winners: [&str; 2], losers: [&str; 2]) -> Vec<PlayerSeasonRecord> {
        vec![
            PlayerSeasonRecord::new(winners[0], "AAA", 4.0, 2000.0),
            PlayerSeasonRecord::new(losers[0], "AAA", 0.0, 2000.0),
            PlayerSeasonRecord::new(winners[1], "BBB", 2.0, 2000.0),
            PlayerSeasonRecord::new(losers[1], "BBB", -2.0, 2000.0),
        ]
    }

    fn fetcher(
        seasons: HashMap<i32, Vec<PlayerSeasonRecord>>,
        final_attempt: FinalAttempt,
    ) -> RetryingSeasonFetcher<FixtureSource> {
        RetryingSeasonFetcher::new(
            FixtureSource { seasons },
            RetryPolicy {
                final_attempt,
                ..RetryPolicy::default()
            },
        )
    }

    #[tokio::test]
    async fn run_prints_progress_then_leaderboard() {
        let mut seasons = HashMap::new();
        seasons.insert(2000, season(["A", "B"], ["C", "D"]));
        seasons.insert(2001, season(["A", "C"], ["B", "D"]));
        seasons.insert(2002, season(["C", "A"], ["D", "B"]));
        let fetcher = fetcher(seasons, FinalAttempt::Always);
        let mut out = Vec::new();

        let scores = run(SeasonRange { start: 2000, end: 2002 }, &fetcher, &mut out)
            .await
            .unwrap();

        // A: [1, 1, 1] -> 0; B: [1, -1, -1] -> 1; C: [-1, 1, 1] -> 2; D: [-1, -1, -1] -> 0
        let by_name: HashMap<&str, f64> =
            scores.iter().map(|s| (s.name.as_str(), s.score)).collect();
        assert!((by_name["A"] - 0.0).abs() < 1e-10);
        assert!((by_name["B"] - 1.0).abs() < 1e-10);
        assert!((by_name["C"] - 2.0).abs() < 1e-10);
        assert!((by_name["D"] - 0.0).abs() < 1e-10);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Processing year 2000...",
                "Processing year 2000...",
                "Processing year 2001...",
                "Processing year 2001...",
                "Processing year 2002...",
                "Processing year 2002...",
                "Name: C, Cumulative Z-score: 2.00",
                "Name: B, Cumulative Z-score: 1.00",
                "Name: A, Cumulative Z-score: 0.00",
                "Name: D, Cumulative Z-score: 0.00",
            ]
        );
    }

    #[tokio::test]
    async fn on_exhaustion_prints_each_season_once() {
        let mut seasons = HashMap::new();
        seasons.insert(1990, season(["A", "B"], ["C", "D"]));
        seasons.insert(1991, season(["A", "B"], ["C", "D"]));
        let fetcher = fetcher(seasons, FinalAttempt::OnExhaustion);
        let mut out = Vec::new();

        rank_seasons(SeasonRange { start: 1990, end: 1991 }, &fetcher, &mut out)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "Processing year 1990...\nProcessing year 1991...\n");
    }

    #[tokio::test]
    async fn failing_season_aborts_whole_run() {
        let mut seasons = HashMap::new();
        seasons.insert(1990, season(["A", "B"], ["C", "D"]));
        let fetcher = fetcher(seasons, FinalAttempt::Always);
        let mut out = Vec::new();

        let err = rank_seasons(SeasonRange { start: 1990, end: 1992 }, &fetcher, &mut out)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SeasonError::Source(SourceError::Http { season: 1991, status: 404 })
        ));
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("1992"));
        assert!(!text.contains("Name:"));
    }
}
