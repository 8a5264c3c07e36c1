mod bootstrap;

use std::time::Duration;

use anyhow::{Context, Result};
use scorer_core::settings::Settings;
use scorer_core::Channel;
use scorer_data::{FileTail, TailConfig};
use scorer_runtime::signals::spawn_signal_bridge;
use scorer_runtime::{Contestant, ScoringSession};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Sweep scorer v{} starting", env!("CARGO_PKG_VERSION"));
    if let Err(e) = settings.persist_last_used() {
        tracing::warn!(error = %e, "could not update saved configuration");
    }

    let scoreboard = bootstrap::build_scoreboard(&settings)?;

    let tail_config =
        TailConfig::default().with_poll_interval(Duration::from_millis(settings.poll_interval_ms));
    let outer = FileTail::spawn(&settings.outer_sweep_file, Channel::Outer, tail_config.clone())
        .await?;
    let inner = FileTail::spawn(&settings.inner_sweep_file, Channel::Inner, tail_config).await?;

    // Installed before the scoreboard call so an early signal is not lost.
    let signals = spawn_signal_bridge()?;

    let contestant = Contestant::new(&settings.name, &settings.class, settings.email());
    let score_id = scoreboard
        .start(&contestant)
        .await
        .context("Unable to start scoring")?;

    let session = ScoringSession::new(scoreboard.clone(), score_id.clone(), outer, inner, signals);

    match session.run().await {
        Ok(report) => {
            tracing::info!(
                score = report.final_score,
                outer = report.outer_samples,
                inner = report.inner_samples,
                updates = report.updates_sent,
                "Final score submitted"
            );
            println!("DONE");
            Ok(())
        }
        Err(e) => {
            if let Err(cancel_err) = scoreboard.cancel(&score_id).await {
                tracing::warn!(error = %cancel_err, score_id = %score_id, "failed to cancel scoring");
            }
            Err(anyhow::Error::new(e).context("Unable to complete scoring"))
        }
    }
}
