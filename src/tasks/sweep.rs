//! Retention Sweep Task
//!
//! Background task that periodically drops projections whose event started
//! longer ago than the retention window.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::tracker::LineMovementTracker;

/// Spawns a background task that periodically sweeps the snapshot.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between sweeps. Sweeps are independent of reconciliations and rely on the
/// store's compare-and-swap like every other writer.
///
/// # Arguments
/// * `tracker` - Shared tracker owning the snapshot
/// * `sweep_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
pub fn spawn_sweep_task(
    tracker: Arc<LineMovementTracker>,
    sweep_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(sweep_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting retention sweep task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let report = tracker.sweep().await;

            if report.removed > 0 {
                info!(
                    "Retention sweep: removed {} projections, {} remaining",
                    report.removed, report.remaining
                );
            } else {
                debug!("Retention sweep: nothing to remove");
            }
        }
    })
}
