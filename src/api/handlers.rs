//! API Handlers
//!
//! HTTP request handlers for each projection service endpoint.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::Value;
use tracing::warn;

use crate::cache::{current_timestamp_ms, KvBackend};
use crate::config::Config;
use crate::error::{ParlayerError, Result};
use crate::feed::ProjectionFeed;
use crate::models::{
    ClearResponse, HealthResponse, ProjectionsResponse, RawEnvelope, StatsResponse,
    SweepResponse,
};
use crate::tracker::LineMovementTracker;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<LineMovementTracker>,
    pub feed: Arc<dyn ProjectionFeed>,
    /// A snapshot fetched more recently than this is served without refetching
    pub min_fetch_interval_ms: i64,
}

impl AppState {
    /// Creates a new AppState.
    pub fn new(
        tracker: LineMovementTracker,
        feed: Arc<dyn ProjectionFeed>,
        min_fetch_interval_ms: i64,
    ) -> Self {
        Self {
            tracker: Arc::new(tracker),
            feed,
            min_fetch_interval_ms,
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(
        config: &Config,
        backend: Arc<dyn KvBackend>,
        feed: Arc<dyn ProjectionFeed>,
    ) -> Self {
        let min_fetch_interval_ms =
            i64::try_from(config.min_fetch_interval.saturating_mul(1000)).unwrap_or(i64::MAX);
        Self::new(
            LineMovementTracker::from_config(config, backend),
            feed,
            min_fetch_interval_ms,
        )
    }
}

/// Handler for GET /projections
///
/// Serves the snapshot if it was fetched recently enough; otherwise fetches
/// the feed and reconciles. A failed fetch falls back to the snapshot.
pub async fn projections_handler(State(state): State<AppState>) -> Result<Json<ProjectionsResponse>> {
    let now = current_timestamp_ms();

    if let Some(entry) = state.tracker.fresh_snapshot_at(now).await {
        if now - entry.last_fetch_time < state.min_fetch_interval_ms {
            return Ok(Json(ProjectionsResponse::new(entry.annotated(), true)));
        }
    }

    match state.feed.fetch().await {
        Ok(batch) => {
            let envelope = state.tracker.reconcile(batch).await;
            Ok(Json(ProjectionsResponse::new(envelope, false)))
        }
        Err(err) => {
            warn!(error = %err, "Feed fetch failed");
            match state.tracker.fresh_snapshot().await {
                Some(entry) => Ok(Json(ProjectionsResponse::new(entry.annotated(), true))),
                None => Err(err),
            }
        }
    }
}

/// Handler for POST /projections/reconcile
///
/// Reconciles a batch pushed by an external fetcher.
pub async fn reconcile_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ProjectionsResponse>> {
    let batch = RawEnvelope::from_json(body)?.into_batch();
    let envelope = state.tracker.reconcile(batch).await;

    Ok(Json(ProjectionsResponse::new(envelope, false)))
}

/// Handler for GET /cache
///
/// Returns the current snapshot with line movement attached, after dropping
/// projections past retention.
pub async fn cache_handler(State(state): State<AppState>) -> Result<Json<ProjectionsResponse>> {
    let entry = state
        .tracker
        .fresh_snapshot()
        .await
        .ok_or_else(|| ParlayerError::NotFound("No cached projections".to_string()))?;

    Ok(Json(ProjectionsResponse::new(entry.annotated(), true)))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.tracker.clear().await;
    Json(ClearResponse::new(state.tracker.store().key()))
}

/// Handler for POST /cache/sweep
pub async fn sweep_handler(State(state): State<AppState>) -> Json<SweepResponse> {
    Json(state.tracker.sweep().await.into())
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.tracker.stats().await.into())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
