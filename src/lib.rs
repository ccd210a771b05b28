//! Parlayer - projection line-movement cache
//!
//! Tracks how prop betting lines move between feed snapshots, annotating
//! each projection with its movement since first observed.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod tasks;
pub mod tracker;

pub use api::AppState;
pub use config::Config;
pub use tasks::{spawn_refresh_task, spawn_sweep_task};
pub use tracker::LineMovementTracker;
