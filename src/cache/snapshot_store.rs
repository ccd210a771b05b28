//! Snapshot Store Module
//!
//! Single-slot persistence of the [`CacheEntry`] on top of a [`KvBackend`].
//! Reads expire stale snapshots lazily. Backend failures never escape this
//! module: reads degrade to "no snapshot" and writes to a logged no-op.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::{current_timestamp_ms, duration_ms, CacheEntry, KvBackend, SharedStats};

/// A value paired with the backend version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

/// Outcome of a conditional save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Another writer got there first
    Conflict,
    /// The backend failed; nothing was written
    Failed,
}

// == Snapshot Store ==
pub struct SnapshotStore {
    backend: Arc<dyn KvBackend>,
    key: String,
    /// Whole-snapshot staleness window
    ttl: Duration,
    stats: SharedStats,
}

impl SnapshotStore {
    // == Constructor ==
    /// Creates a store writing to `key` in `backend`.
    ///
    /// # Arguments
    /// * `backend` - Key-value backend holding the snapshot
    /// * `key` - The single slot the snapshot lives under
    /// * `ttl` - Snapshots older than this since their last fetch are discarded
    /// * `stats` - Counters for expirations and swallowed failures
    pub fn new(
        backend: Arc<dyn KvBackend>,
        key: impl Into<String>,
        ttl: Duration,
        stats: SharedStats,
    ) -> Self {
        Self {
            backend,
            key: key.into(),
            ttl,
            stats,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    // == Load ==
    /// Reads the snapshot, or `None` if absent, stale or unreadable.
    pub async fn load(&self) -> Option<CacheEntry> {
        self.load_at(current_timestamp_ms()).await
    }

    pub async fn load_at(&self, now: i64) -> Option<CacheEntry> {
        self.load_versioned_at(now).await.map(|loaded| loaded.value)
    }

    /// Reads the snapshot together with the backend version, for a later
    /// [`SnapshotStore::save_if`].
    pub async fn load_versioned_at(&self, now: i64) -> Option<Versioned<CacheEntry>> {
        let stored = match self.backend.get(&self.key).await {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                debug!(key = %self.key, "No snapshot found");
                return None;
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read snapshot, treating as empty");
                self.stats.write().await.record_store_failure();
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&stored.value) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Discarding unreadable snapshot");
                self.delete().await;
                return None;
            }
        };

        if entry.is_stale_at(now, duration_ms(self.ttl)) {
            info!(
                key = %self.key,
                last_fetch_time = entry.last_fetch_time,
                "Snapshot expired, clearing"
            );
            self.stats.write().await.record_expiration();
            self.delete().await;
            return None;
        }

        debug!(key = %self.key, projections = entry.data.len(), "Loaded snapshot");
        Some(Versioned {
            value: entry,
            version: stored.version,
        })
    }

    // == Save ==
    /// Overwrites the snapshot unconditionally.
    pub async fn save(&self, entry: &CacheEntry) {
        let Some(payload) = self.encode(entry) else {
            return;
        };

        match self.backend.put(&self.key, payload, Some(self.ttl)).await {
            Ok(_) => debug!(key = %self.key, projections = entry.data.len(), "Snapshot saved"),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to save snapshot");
                self.stats.write().await.record_store_failure();
            }
        }
    }

    /// Overwrites the snapshot only if it is still at `expected` (`None` =
    /// only if no snapshot exists).
    pub async fn save_if(&self, entry: &CacheEntry, expected: Option<u64>) -> SaveOutcome {
        let Some(payload) = self.encode(entry) else {
            return SaveOutcome::Failed;
        };

        match self
            .backend
            .put_if_version(&self.key, payload, Some(self.ttl), expected)
            .await
        {
            Ok(true) => {
                debug!(key = %self.key, projections = entry.data.len(), "Snapshot saved");
                SaveOutcome::Saved
            }
            Ok(false) => SaveOutcome::Conflict,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to save snapshot");
                self.stats.write().await.record_store_failure();
                SaveOutcome::Failed
            }
        }
    }

    // == Clear ==
    /// Deletes the snapshot outright.
    pub async fn clear(&self) {
        if self.delete().await {
            info!(key = %self.key, "Snapshot cleared");
        }
    }

    /// Deletes the snapshot only if it is still at `expected`.
    pub async fn clear_if(&self, expected: u64) -> SaveOutcome {
        match self.backend.delete_if_version(&self.key, expected).await {
            Ok(true) => {
                info!(key = %self.key, "Snapshot cleared");
                SaveOutcome::Saved
            }
            Ok(false) => SaveOutcome::Conflict,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to delete snapshot");
                self.stats.write().await.record_store_failure();
                SaveOutcome::Failed
            }
        }
    }

    async fn delete(&self) -> bool {
        match self.backend.delete(&self.key).await {
            Ok(existed) => existed,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to delete snapshot");
                self.stats.write().await.record_store_failure();
                false
            }
        }
    }

    fn encode(&self, entry: &CacheEntry) -> Option<String> {
        match serde_json::to_string(entry) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to encode snapshot");
                None
            }
        }
    }
}
