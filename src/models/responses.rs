//! Response DTOs for the projection service API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::models::ProjectionEnvelope;
use crate::tracker::SweepReport;

/// Response body for GET /projections, POST /projections/reconcile and GET /cache
#[derive(Debug, Clone, Serialize)]
pub struct ProjectionsResponse {
    pub success: bool,
    /// Projections (annotated with line movement) and the included side-table
    pub data: ProjectionEnvelope,
    /// Whether the data was served from the snapshot without a fresh fetch
    pub cached: bool,
}

impl ProjectionsResponse {
    /// Creates a new ProjectionsResponse
    pub fn new(data: ProjectionEnvelope, cached: bool) -> Self {
        Self {
            success: true,
            data,
            cached,
        }
    }
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: String,
}

impl ClearResponse {
    /// Creates a new ClearResponse
    pub fn new(key: &str) -> Self {
        Self {
            success: true,
            message: format!("Cache '{}' cleared", key),
        }
    }
}

/// Response body for POST /cache/sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepResponse {
    pub success: bool,
    /// Projections removed for being past the retention window
    pub removed: usize,
    /// Projections still cached
    pub remaining: usize,
    /// Whether the whole snapshot was discarded
    pub cleared: bool,
}

impl From<SweepReport> for SweepResponse {
    fn from(report: SweepReport) -> Self {
        Self {
            success: true,
            removed: report.removed,
            remaining: report.remaining,
            cleared: report.cleared,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub reconciliations: u64,
    pub sweeps: u64,
    pub new_projections: u64,
    pub movements_detected: u64,
    pub unchanged_projections: u64,
    pub evicted_projections: u64,
    pub snapshot_expirations: u64,
    pub store_failures: u64,
    pub write_conflicts: u64,
    pub skipped_items: u64,
    /// Share of previously seen projections whose line had moved
    pub movement_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            movement_rate: stats.movement_rate(),
            reconciliations: stats.reconciliations,
            sweeps: stats.sweeps,
            new_projections: stats.new_projections,
            movements_detected: stats.movements_detected,
            unchanged_projections: stats.unchanged_projections,
            evicted_projections: stats.evicted_projections,
            snapshot_expirations: stats.snapshot_expirations,
            store_failures: stats.store_failures,
            write_conflicts: stats.write_conflicts,
            skipped_items: stats.skipped_items,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
