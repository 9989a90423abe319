// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::search::SearchService;

/// Spawn the periodic refresh loop.
///
/// The first refresh runs one `every` after spawn. A failed tick is logged
/// and the loop keeps going; cancelling `cancel` stops it, aborting an
/// in-flight refresh before its write phase.
///
/// `every` must be non-zero; callers skip spawning when refresh is disabled.
pub fn spawn_refresh_loop(
    service: Arc<SearchService>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(target: "ingest", interval_secs = every.as_secs(), "refresh loop started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match service.refresh_content(&cancel).await {
                Ok(report) => tracing::info!(
                    target: "ingest",
                    fetched = report.fetched,
                    inserted = report.inserted,
                    updated = report.updated,
                    "scheduled refresh"
                ),
                Err(e) => tracing::warn!(target: "ingest", error = %e, "scheduled refresh failed"),
            }
        }

        tracing::info!(target: "ingest", "refresh loop stopped");
    })
}
