//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Sweep: drops projections past the retention window
//! - Refresh: fetches the feed and reconciles on a schedule

mod refresh;
mod sweep;

pub use refresh::spawn_refresh_task;
pub use sweep::spawn_sweep_task;
