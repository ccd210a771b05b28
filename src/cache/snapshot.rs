//! Snapshot Module
//!
//! The persisted state of the line-movement cache: every tracked projection
//! with its first-observed line, plus the opaque `included` side-table.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{LineMovement, Projection, ProjectionEnvelope};

// == Cached Projection ==
/// A projection plus the tracker's bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedProjection {
    #[serde(flatten)]
    pub projection: Projection,
    /// Line value the first time this id was observed; never overwritten
    pub original_line_score: f64,
    /// Unix milliseconds of the last reconciliation that saw this id
    pub last_updated: i64,
}

impl CachedProjection {
    /// Starts tracking a projection seen for the first time.
    pub fn first_seen(projection: &Projection, now: i64) -> Self {
        Self {
            original_line_score: projection.line_score(),
            projection: projection.with_movement(None),
            last_updated: now,
        }
    }

    /// Replaces the tracked projection with a newer observation, keeping the
    /// original line.
    pub fn observe(&mut self, projection: &Projection, now: i64) {
        self.projection = projection.with_movement(None);
        self.last_updated = now;
    }

    /// Movement of the latest observed line against the baseline.
    pub fn movement(&self) -> Option<LineMovement> {
        LineMovement::between(self.original_line_score, self.projection.line_score())
    }

    /// The tracked projection, annotated with its line movement.
    pub fn annotated(&self) -> Projection {
        self.projection.with_movement(self.movement())
    }

    /// Whether the projection's event started less than `retention_ms` ago.
    pub fn is_retained_at(&self, now: i64, retention_ms: i64) -> bool {
        now.saturating_sub(self.projection.start_time_ms()) < retention_ms
    }

    pub fn id(&self) -> &str {
        &self.projection.id
    }
}

// == Cache Entry ==
/// The whole persisted snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub data: Vec<CachedProjection>,
    #[serde(default)]
    pub included: Vec<Value>,
    /// Unix milliseconds of the most recent successful reconciliation
    pub last_fetch_time: i64,
}

impl CacheEntry {
    /// Whether more than `ttl_ms` has passed since the last fetch.
    pub fn is_stale_at(&self, now: i64, ttl_ms: i64) -> bool {
        now.saturating_sub(self.last_fetch_time) > ttl_ms
    }

    pub fn find(&self, id: &str) -> Option<&CachedProjection> {
        self.data.iter().find(|cached| cached.id() == id)
    }

    /// The snapshot as an outgoing envelope, with line movement attached.
    pub fn annotated(&self) -> ProjectionEnvelope {
        ProjectionEnvelope {
            data: self.data.iter().map(CachedProjection::annotated).collect(),
            included: self.included.clone(),
        }
    }
}
