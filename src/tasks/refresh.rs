//! Scheduled Refresh Task
//!
//! Periodically pulls the upstream feed and reconciles it, so line movement
//! is tracked even when no client is asking for projections.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::feed::ProjectionFeed;
use crate::tracker::LineMovementTracker;

/// Spawns a background task that fetches and reconciles on a fixed interval.
///
/// Returns `None` when `refresh_interval_secs` is 0. Fetch failures are
/// logged and the loop carries on; the feed applies its own retry policy.
pub fn spawn_refresh_task(
    feed: Arc<dyn ProjectionFeed>,
    tracker: Arc<LineMovementTracker>,
    refresh_interval_secs: u64,
) -> Option<JoinHandle<()>> {
    if refresh_interval_secs == 0 {
        return None;
    }
    let interval = Duration::from_secs(refresh_interval_secs);

    Some(tokio::spawn(async move {
        info!(
            "Starting scheduled refresh task with interval of {} seconds",
            refresh_interval_secs
        );

        loop {
            match feed.fetch().await {
                Ok(batch) => {
                    tracker.reconcile(batch).await;
                }
                Err(err) => warn!(error = %err, "Scheduled refresh failed"),
            }

            tokio::time::sleep(interval).await;
        }
    }))
}
