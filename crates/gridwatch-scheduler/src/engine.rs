//! Scheduler engine: the periodic polling loop.
//! Sleeps between cycles; a `watch` flag stops it before the next sleep or
//! wakes it early while sleeping.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::monitor::{Monitor, PollOutcome};

/// Spawn the polling loop as a background tokio task.
pub fn spawn_scheduler(monitor: Arc<Monitor>, interval: Duration, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(run_scheduler(monitor, interval, shutdown))
}

/// The polling loop itself. Returns once `shutdown` flips to true or its
/// sender is dropped.
pub async fn run_scheduler(monitor: Arc<Monitor>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    tracing::info!(
        "⏰ Scheduler started: {} platform(s), every {}s",
        monitor.platforms().len(),
        interval.as_secs()
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        }

        let outcomes = monitor.poll_all().await;
        log_cycle(&outcomes);
    }

    tracing::info!("⏹️ Scheduler stopped");
}

/// One poll cycle ahead of the scheduler so its first cycle can already
/// diff. Abandoned as soon as `stop` resolves; returns false in that case.
pub async fn seed_cache<F: Future>(monitor: &Monitor, stop: F) -> bool {
    tokio::select! {
        outcomes = monitor.poll_all() => {
            log_cycle(&outcomes);
            true
        }
        _ = stop => {
            tracing::info!("🛑 Startup poll interrupted");
            false
        }
    }
}

fn log_cycle(outcomes: &[PollOutcome]) {
    let mut failed = 0;
    for outcome in outcomes {
        match outcome {
            PollOutcome::Updated { events, failures, .. } => {
                for event in events {
                    tracing::info!("📣 [{}] {}: {}", event.platform, event.kind, event.summary);
                }
                if !failures.is_empty() {
                    tracing::warn!(
                        "⚠️ {}: {} notification(s) failed",
                        outcome.platform(),
                        failures.len()
                    );
                }
            }
            PollOutcome::Stale { status } => {
                tracing::debug!("⏪ {}: stale status dropped", status.platform);
            }
            PollOutcome::Failed { platform, error } => {
                failed += 1;
                tracing::warn!("⚠️ {platform} poll failed: {error}");
            }
        }
    }
    tracing::debug!("🔁 Poll cycle done: {} ok, {failed} failed", outcomes.len() - failed);
}
