//! Background tasks for the game client.
//!
//! Both loops run until their [`CancellationToken`] is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::mining::MiningService;

/// Countdown resolution.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// How often expired boosts are dropped.
pub const BOOST_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Tick the local mining countdown once per [`TICK_INTERVAL`].
pub fn spawn_countdown(service: Arc<MiningService>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Countdown stopping");
                    break;
                }
                _ = interval.tick() => {
                    service.tick().await;
                }
            }
        }
    })
}

/// Prune expired boosts every `period`.
pub fn spawn_boost_sweep(
    service: Arc<MiningService>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(interval_secs = period.as_secs(), "Boost sweep started");
        let mut interval = tokio::time::interval(period);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Boost sweep stopping");
                    break;
                }
                _ = interval.tick() => {
                    let removed = service.sweep_boosts().await;
                    if removed > 0 {
                        tracing::debug!(removed, "Expired boosts removed");
                    }
                }
            }
        }
    })
}
