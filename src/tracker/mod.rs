//! Line-Movement Tracker
//!
//! Reconciles fresh projection batches against the persisted snapshot,
//! annotating projections whose line moved since they were first observed,
//! and sweeps projections whose event started too long ago.
//!
//! Invocations are independent. Concurrent reconciliations are serialised
//! only through the backend's compare-and-swap; once the retries are spent
//! the last writer wins.

mod merge;
mod policy;


use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{
    current_timestamp_ms, CacheEntry, CacheStats, KvBackend, SaveOutcome, SharedStats,
    SnapshotStore,
};
use crate::config::Config;
use crate::models::{Projection, ProjectionBatch, ProjectionEnvelope};

pub use merge::{merge, Merged};
pub use policy::ExpiryPolicy;

/// Outcome of a retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub remaining: usize,
    /// Whether the snapshot was deleted because nothing remained
    pub cleared: bool,
}

// == Line-Movement Tracker ==
pub struct LineMovementTracker {
    store: SnapshotStore,
    policy: ExpiryPolicy,
    /// Conditional write attempts before an unconditional one
    write_retries: u32,
    stats: SharedStats,
}

impl LineMovementTracker {
    // == Constructor ==
    pub fn new(
        backend: Arc<dyn KvBackend>,
        key: impl Into<String>,
        policy: ExpiryPolicy,
        write_retries: u32,
    ) -> Self {
        let stats = CacheStats::shared();
        let store = SnapshotStore::new(backend, key, policy.snapshot_ttl, stats.clone());
        Self {
            store,
            policy,
            write_retries,
            stats,
        }
    }

    pub fn from_config(config: &Config, backend: Arc<dyn KvBackend>) -> Self {
        Self::new(
            backend,
            config.cache_key.clone(),
            ExpiryPolicy::from_config(config),
            config.write_retries,
        )
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    /// Returns a copy of the current counters.
    pub async fn stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }

    // == Reconcile ==
    /// Reconciles a validated feed batch at the current time.
    pub async fn reconcile(&self, batch: ProjectionBatch) -> ProjectionEnvelope {
        if batch.skipped > 0 {
            self.stats.write().await.record_skipped(batch.skipped);
        }
        self.reconcile_at(batch.data, batch.included, current_timestamp_ms())
            .await
    }

    /// Reconciles `data` against the snapshot as of `now`.
    ///
    /// Sweeps first, then merges and persists. The returned envelope is the
    /// batch in input order, re-observed projections annotated with their
    /// line movement, paired with `included`. Store failures degrade to
    /// "no prior state" and never surface here.
    pub async fn reconcile_at(
        &self,
        data: Vec<Projection>,
        included: Vec<Value>,
        now: i64,
    ) -> ProjectionEnvelope {
        self.sweep_at(now).await;

        let retention_ms = self.policy.retention_ms();
        let mut merged = None;

        for attempt in 1..=self.write_retries {
            let prior = self.store.load_versioned_at(now).await;
            let expected = prior.as_ref().map(|loaded| loaded.version);
            let candidate = merge(
                prior.map(|loaded| loaded.value),
                &data,
                included.clone(),
                now,
                retention_ms,
            );

            match self.store.save_if(&candidate.entry, expected).await {
                SaveOutcome::Conflict => {
                    self.stats.write().await.record_write_conflict();
                    debug!(attempt, "Snapshot changed underneath reconcile, retrying");
                }
                SaveOutcome::Saved | SaveOutcome::Failed => {
                    merged = Some(candidate);
                    break;
                }
            }
        }

        let merged = match merged {
            Some(merged) => merged,
            None => {
                if self.write_retries > 0 {
                    warn!(
                        attempts = self.write_retries,
                        "Conditional writes exhausted, overwriting snapshot"
                    );
                }
                let prior = self.store.load_at(now).await;
                let candidate = merge(prior, &data, included, now, retention_ms);
                self.store.save(&candidate.entry).await;
                candidate
            }
        };

        self.stats
            .write()
            .await
            .record_reconciliation(merged.new, merged.moved, merged.unchanged);
        info!(
            projections = merged.output.len(),
            new = merged.new,
            moved = merged.moved,
            cached = merged.entry.data.len(),
            "Reconciled projection batch"
        );

        ProjectionEnvelope {
            data: merged.output,
            included: merged.entry.included,
        }
    }

    // == Sweep ==
    /// Drops projections past the retention window at the current time.
    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(current_timestamp_ms()).await
    }

    /// Drops projections whose start time is at least the retention window
    /// before `now`. Deletes the snapshot when nothing remains.
    pub async fn sweep_at(&self, now: i64) -> SweepReport {
        let Some(loaded) = self.store.load_versioned_at(now).await else {
            self.stats.write().await.record_sweep(0);
            return SweepReport::default();
        };

        let retention_ms = self.policy.retention_ms();
        let mut entry = loaded.value;
        let before = entry.data.len();
        entry
            .data
            .retain(|cached| cached.is_retained_at(now, retention_ms));
        let removed = before - entry.data.len();

        let remaining = entry.data.len();
        let outcome = if remaining == 0 {
            Some(self.store.clear_if(loaded.version).await)
        } else if removed > 0 {
            Some(self.store.save_if(&entry, Some(loaded.version)).await)
        } else {
            None
        };

        if outcome == Some(SaveOutcome::Conflict) {
            // The writer that won saw the same snapshot and drops the same projections
            self.stats.write().await.record_write_conflict();
            debug!("Snapshot changed underneath sweep, leaving it to the next pass");
        }
        let report = SweepReport {
            removed,
            remaining,
            cleared: remaining == 0 && outcome == Some(SaveOutcome::Saved),
        };

        self.stats.write().await.record_sweep(removed);
        if removed > 0 {
            info!(
                removed,
                remaining = report.remaining,
                cleared = report.cleared,
                "Swept expired projections"
            );
        }
        report
    }

    // == Snapshot Access ==
    /// Current snapshot, if any.
    pub async fn snapshot(&self) -> Option<CacheEntry> {
        self.store.load().await
    }

    pub async fn snapshot_at(&self, now: i64) -> Option<CacheEntry> {
        self.store.load_at(now).await
    }

    /// Snapshot for serving: projections past retention are swept first, so
    /// finished events never go out with a movement annotation.
    pub async fn fresh_snapshot(&self) -> Option<CacheEntry> {
        self.fresh_snapshot_at(current_timestamp_ms()).await
    }

    pub async fn fresh_snapshot_at(&self, now: i64) -> Option<CacheEntry> {
        self.sweep_at(now).await;
        self.store.load_at(now).await
    }

    /// Deletes the snapshot, bypassing reconciliation.
    pub async fn clear(&self) {
        self.store.clear().await;
    }
}
