//! API Module
//!
//! HTTP handlers and routing for the projection service REST API.
//!
//! # Endpoints
//! - `GET /projections` - Fetch (or reuse) and reconcile the board
//! - `POST /projections/reconcile` - Reconcile a pushed batch
//! - `GET /cache` / `DELETE /cache` - Read or clear the snapshot
//! - `POST /cache/sweep` - Run the retention sweep now
//! - `GET /stats` - Tracker statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
