//! Periodic crawl worker: runs one cycle per interval, never overlapping.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::service::IngestService;

/// Runs crawl cycles until the shutdown signal fires.
///
/// The first cycle starts immediately; later cycles wait for the ticker,
/// and cycles never overlap because each one is awaited in the loop. The
/// shutdown signal also aborts an in-flight cycle: dropping the cycle
/// future cancels its fetches and rolls back its open transaction. A
/// failed cycle is logged and the worker keeps ticking — the next cycle
/// retries the whole source set from scratch.
pub async fn run(service: Arc<IngestService>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    tracing::info!(interval_secs = interval.as_secs(), "crawl worker started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("crawl worker stopping");
                return;
            }
            _ = ticker.tick() => {}
        }

        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("crawl worker stopping mid-cycle");
                return;
            }
            result = service.run_crawl_cycle() => match result {
                Ok(summary) => {
                    tracing::info!(
                        feeds = summary.feeds,
                        articles = summary.articles,
                        "crawl cycle complete"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "crawl cycle failed");
                }
            }
        }
    }
}
