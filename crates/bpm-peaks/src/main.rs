// BPM peak ranker entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, stdout carries the report)
// 2. Load config
// 3. Build the configured season source
// 4. Walk every season, then print the leaderboard

use bpm_peaks::app;
use bpm_peaks::config;
use bpm_peaks::fetch::RetryingSeasonFetcher;
use bpm_peaks::source::ConfiguredSource;

use anyhow::Context;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("BPM peak ranker starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: seasons {}-{}, {} retries",
        config.seasons.start, config.seasons.end, config.retry.max_retries
    );

    let source = ConfiguredSource::from_config(&config).context("failed to build HTTP client")?;
    info!("Season source: {}", source.describe());

    let fetcher = RetryingSeasonFetcher::new(source, config.retry_policy());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match app::run(config.seasons, &fetcher, &mut out).await {
        Ok(scores) => {
            info!("Ranked {} players", scores.len());
            Ok(())
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            Err(e)
        }
    }
}

/// Initialize tracing to log to a file so stdout stays clean for the report.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("bpm-peaks.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bpm_peaks=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
