//! Periodic eviction of expired job status records.
//!
//! Reads already treat expired records as absent; the sweep only reclaims
//! their memory. Runs on a fixed interval using `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use docgen_pipeline::StatusStore;
use tokio_util::sync::CancellationToken;

/// Run the sweep loop until `cancel` is triggered.
pub async fn run(store: Arc<StatusStore>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        "Status sweep job started"
    );

    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately; nothing can have expired yet.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Status sweep job stopping");
                break;
            }
            _ = ticker.tick() => {
                let evicted = store.sweep().await;
                if evicted > 0 {
                    let remaining = store.len().await;
                    tracing::info!(evicted, remaining, "Status sweep: evicted expired records");
                } else {
                    tracing::debug!("Status sweep: nothing to evict");
                }
            }
        }
    }
}
