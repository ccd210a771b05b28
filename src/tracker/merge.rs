//! Reconciliation of a fresh batch against the prior snapshot.
//!
//! Pure: takes the prior entry by value and returns the annotated output
//! together with the entry to persist. All I/O lives in the tracker.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheEntry, CachedProjection};
use crate::models::Projection;

/// Result of merging one batch.
#[derive(Debug, Clone)]
pub struct Merged {
    /// Batch in input order; re-observed projections carry `line_movement`
    /// when their line differs from the baseline
    pub output: Vec<Projection>,
    /// Snapshot to persist
    pub entry: CacheEntry,
    pub new: usize,
    pub moved: usize,
    pub unchanged: usize,
}

/// Merges `batch` into `prior`.
///
/// Prior projections already past `retention_ms` are dropped. Prior
/// projections missing from the batch are kept as they are. Baselines are
/// never overwritten.
pub fn merge(
    prior: Option<CacheEntry>,
    batch: &[Projection],
    included: Vec<Value>,
    now: i64,
    retention_ms: i64,
) -> Merged {
    let mut data: Vec<CachedProjection> = prior
        .map(|entry| entry.data)
        .unwrap_or_default()
        .into_iter()
        .filter(|cached| cached.is_retained_at(now, retention_ms))
        .collect();

    let mut index: HashMap<String, usize> = data
        .iter()
        .enumerate()
        .map(|(pos, cached)| (cached.id().to_string(), pos))
        .collect();

    let mut output = Vec::with_capacity(batch.len());
    let (mut new, mut moved, mut unchanged) = (0, 0, 0);

    for projection in batch {
        match index.get(&projection.id) {
            Some(&pos) => {
                let cached = &mut data[pos];
                cached.observe(projection, now);
                let movement = cached.movement();

                match &movement {
                    Some(m) => {
                        moved += 1;
                        debug!(
                            id = %projection.id,
                            original = m.original,
                            current = m.current,
                            "Line moved"
                        );
                    }
                    None => unchanged += 1,
                }
                output.push(projection.with_movement(movement));
            }
            None => {
                index.insert(projection.id.clone(), data.len());
                data.push(CachedProjection::first_seen(projection, now));
                new += 1;
                output.push(projection.with_movement(None));
            }
        }
    }

    Merged {
        output,
        entry: CacheEntry {
            data,
            included,
            last_fetch_time: now,
        },
        new,
        moved,
        unchanged,
    }
}
