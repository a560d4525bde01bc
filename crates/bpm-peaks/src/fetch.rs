// Season fetching with rate-limit backoff.
//
// The policy has two phases:
// 1. Bounded retry: up to `max_retries` rate-limited attempts, sleeping
//    `2^attempt` backoff units after each one.
// 2. Final attempt: one more unguarded run of the season pipeline. With
//    `FinalAttempt::Always` it runs whatever phase 1 did, so a season is never
//    skipped because retries ran out.

use std::io::Write;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::source::{SeasonSource, SourceError};
use crate::valuation::season::{score_season, SeasonResult};
use crate::valuation::ValuationError;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

pub const DEFAULT_MAX_RETRIES: u32 = 3;

pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// When the unguarded attempt after the retry loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalAttempt {
    /// Always run the season again after the retry loop, even if it already
    /// succeeded. Doubles the work per season; kept as the default so output
    /// stays comparable with earlier runs.
    #[default]
    Always,
    /// Only run the final attempt when every retry was rate limited.
    OnExhaustion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_unit: Duration,
    pub final_attempt: FinalAttempt,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
            final_attempt: FinalAttempt::Always,
        }
    }
}

impl RetryPolicy {
    /// Sleep before retry number `attempt` (1-based): `2^attempt` units.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_unit * 2u32.saturating_pow(attempt)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SeasonError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Valuation(#[from] ValuationError),

    #[error("failed to write progress output: {0}")]
    Output(#[from] std::io::Error),
}

impl SeasonError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SeasonError::Source(e) if e.is_rate_limited())
    }
}

// ---------------------------------------------------------------------------
// RetryingSeasonFetcher
// ---------------------------------------------------------------------------

/// Runs fetch, team normalization and league aggregation for a season under a
/// `RetryPolicy`.
pub struct RetryingSeasonFetcher<S> {
    source: S,
    policy: RetryPolicy,
}

impl<S: SeasonSource> RetryingSeasonFetcher<S> {
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Score one season, writing progress lines to `out`.
    ///
    /// `Processing year {Y}...` is written before the retry loop and again
    /// before the final attempt.
    pub async fn fetch(
        &self,
        season: i32,
        out: &mut dyn Write,
    ) -> Result<SeasonResult, SeasonError> {
        writeln!(out, "Processing year {season}...")?;

        let retried = self.retry_phase(season, out).await?;
        let retry_succeeded = retried.is_some();
        if self.policy.final_attempt == FinalAttempt::OnExhaustion {
            if let Some(result) = retried {
                debug!(season, "retry phase succeeded; skipping final attempt");
                return Ok(result);
            }
        }

        writeln!(out, "Processing year {season}...")?;
        info!(season, retry_succeeded, "final attempt");
        self.attempt(season).await
    }

    /// Phase 1. `Ok(None)` when every retry was rate limited.
    async fn retry_phase(
        &self,
        season: i32,
        out: &mut dyn Write,
    ) -> Result<Option<SeasonResult>, SeasonError> {
        let mut attempt = 0;
        while attempt < self.policy.max_retries {
            match self.attempt(season).await {
                Ok(result) => return Ok(Some(result)),
                Err(e) if e.is_rate_limited() => {
                    attempt += 1;
                    let delay = self.policy.backoff(attempt);
                    let delay_secs = delay.as_secs_f64();
                    warn!(season, attempt, delay_secs, "rate limited, backing off");
                    writeln!(out, "Hit rate limit. Retrying in {delay_secs} seconds...")?;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
        warn!(season, retries = attempt, "retries exhausted");
        Ok(None)
    }

    async fn attempt(&self, season: i32) -> Result<SeasonResult, SeasonError> {
        let records = self.source.fetch_season(season).await?;
        Ok(score_season(season, &records)?)
    }
}
