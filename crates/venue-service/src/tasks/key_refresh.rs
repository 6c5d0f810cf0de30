//! Periodic signing key refresh.
//!
//! Keeps the key cache warm so the first request after a rotation does not
//! pay for the fetch. Refetch-on-miss still applies; this task only
//! shortens the window. A failed refresh keeps the previous snapshot.

use crate::auth::KeyCache;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Refresh `key_cache` every `interval` until `cancel_token` fires.
///
/// The first tick fires immediately, so keys are fetched at startup.
pub async fn start_key_refresh(
    key_cache: KeyCache,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    info!(
        target: "venue.tasks.key_refresh",
        interval_seconds = interval.as_secs(),
        "Key refresh task started"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match key_cache.refresh().await {
                    Ok(()) => {
                        // Awaited outside the macro so the future stays Send
                        let key_count = key_cache.key_count().await;
                        tracing::debug!(
                            target: "venue.tasks.key_refresh",
                            key_count = key_count,
                            "Signing keys refreshed"
                        );
                    }
                    Err(e) => {
                        warn!(
                            target: "venue.tasks.key_refresh",
                            error = %e,
                            "Signing key refresh failed, keeping previous keys"
                        );
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "venue.tasks.key_refresh",
                    "Key refresh task received shutdown signal, exiting"
                );
                break;
            }
        }
    }
}
