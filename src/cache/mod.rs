//! Cache Module
//!
//! Snapshot persistence for the line-movement tracker: versioned key-value
//! backends with TTL, the snapshot data model, and the single-slot store.

mod entry;
mod file;
mod snapshot;
mod snapshot_store;
mod stats;
mod store;

// Re-export public types
pub use entry::{current_timestamp_ms, duration_ms, StoredValue};
pub use file::FileBackend;
pub use snapshot::{CacheEntry, CachedProjection};
pub use snapshot_store::{SaveOutcome, SnapshotStore, Versioned};
pub use stats::{CacheStats, SharedStats};
pub use store::{KvBackend, MemoryBackend};

#[cfg(test)]
pub(crate) use snapshot_store::test_support;
