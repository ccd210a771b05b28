//! Cache Statistics Module
//!
//! Tracks reconciliation and eviction counters for the projection cache.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

/// Statistics shared between the snapshot store and the tracker.
pub type SharedStats = Arc<RwLock<CacheStats>>;

// == Cache Stats ==
/// Tracks projection cache activity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Completed reconciliations
    pub reconciliations: u64,
    /// Completed retention sweeps
    pub sweeps: u64,
    /// Projections observed for the first time
    pub new_projections: u64,
    /// Previously seen projections whose line differed from the baseline
    pub movements_detected: u64,
    /// Previously seen projections still at their baseline
    pub unchanged_projections: u64,
    /// Projections dropped by the retention window
    pub evicted_projections: u64,
    /// Whole snapshots discarded for staleness
    pub snapshot_expirations: u64,
    /// Backend reads or writes that failed and were swallowed
    pub store_failures: u64,
    /// Conditional writes that lost a race
    pub write_conflicts: u64,
    /// Malformed feed items dropped before reconciliation
    pub skipped_items: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new shared, lockable CacheStats.
    pub fn shared() -> SharedStats {
        Arc::new(RwLock::new(Self::new()))
    }

    // == Movement Rate ==
    /// Calculates the share of re-observed projections whose line had moved.
    ///
    /// Returns 0.0 if no projection has been seen twice yet.
    pub fn movement_rate(&self) -> f64 {
        let total = self.movements_detected + self.unchanged_projections;
        if total == 0 {
            0.0
        } else {
            self.movements_detected as f64 / total as f64
        }
    }

    /// Folds the outcome of one reconciliation into the counters.
    pub fn record_reconciliation(&mut self, new: usize, moved: usize, unchanged: usize) {
        self.reconciliations += 1;
        self.new_projections += new as u64;
        self.movements_detected += moved as u64;
        self.unchanged_projections += unchanged as u64;
    }

    pub fn record_sweep(&mut self, evicted: usize) {
        self.sweeps += 1;
        self.evicted_projections += evicted as u64;
    }

    pub fn record_expiration(&mut self) {
        self.snapshot_expirations += 1;
    }

    pub fn record_store_failure(&mut self) {
        self.store_failures += 1;
    }

    pub fn record_write_conflict(&mut self) {
        self.write_conflicts += 1;
    }

    pub fn record_skipped(&mut self, count: usize) {
        self.skipped_items += count as u64;
    }
}
