//! Periodic rate sampling.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::registry::DeviceRegistry;

/// Sample every registered device once.
pub fn sample(registry: &DeviceRegistry, interval: Duration) {
    for device in registry.devices() {
        let rates = device.sample_rates(interval);
        tracing::trace!(
            device = %device.id(),
            bps = rates.bps,
            fps = rates.fps,
            lost_chunks = device.lost_chunks(),
            "Sampled rates"
        );
    }
}

/// Recompute rates every `interval` until cancelled.
pub async fn run_stats(registry: Arc<DeviceRegistry>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ticker.tick().await;

    tracing::info!(interval_ms = interval.as_millis() as u64, "Statistics sampler started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Statistics sampler shutting down");
                break;
            }
            _ = ticker.tick() => {
                sample(&registry, interval);
            }
        }
    }
}
