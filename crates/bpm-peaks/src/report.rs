// Leaderboard output.

use std::io::{self, Write};

use crate::valuation::ranker::CumulativeScore;

/// Number of players printed on the final leaderboard.
pub const TOP_N: usize = 5;

/// Highest scores first. The sort is stable, so ties keep their input order.
pub fn rank(scores: &[CumulativeScore]) -> Vec<&CumulativeScore> {
    let mut ranked: Vec<&CumulativeScore> = scores.iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

pub fn format_line(entry: &CumulativeScore) -> String {
    format!("Name: {}, Cumulative Z-score: {:.2}", entry.name, entry.score)
}

/// Write the top `n` players, one line each.
pub fn write_top(out: &mut dyn Write, scores: &[CumulativeScore], n: usize) -> io::Result<()> {
    for entry in rank(scores).into_iter().take(n) {
        writeln!(out, "{}", format_line(entry))?;
    }
    Ok(())
}
