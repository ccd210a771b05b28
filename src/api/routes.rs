//! API Routes
//!
//! Configures the Axum router with all projection service endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_handler, clear_handler, health_handler, projections_handler, reconcile_handler,
    stats_handler, sweep_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /projections` - Fetch (or reuse) and reconcile the board
/// - `POST /projections/reconcile` - Reconcile a pushed batch
/// - `GET /cache` - Current snapshot
/// - `DELETE /cache` - Clear the snapshot
/// - `POST /cache/sweep` - Run the retention sweep now
/// - `GET /stats` - Tracker statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/projections", get(projections_handler))
        .route("/projections/reconcile", post(reconcile_handler))
        .route("/cache", get(cache_handler).delete(clear_handler))
        .route("/cache/sweep", post(sweep_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
