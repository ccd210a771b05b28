//! Expiry policy
//!
//! The two windows governing how long cached data lives. They default to the
//! same four hours but are independent: one bounds how old a snapshot may be,
//! the other how long after kick-off a projection is still worth tracking.

use std::time::Duration;

use crate::cache::duration_ms;
use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    /// Whole snapshot is discarded this long after its last fetch
    pub snapshot_ttl: Duration,
    /// Projections are dropped this long after their start time
    pub projection_retention: Duration,
}

impl ExpiryPolicy {
    pub const FOUR_HOURS: Duration = Duration::from_secs(4 * 60 * 60);

    pub fn from_config(config: &Config) -> Self {
        Self {
            snapshot_ttl: Duration::from_secs(config.snapshot_ttl),
            projection_retention: Duration::from_secs(config.projection_retention),
        }
    }

    pub fn retention_ms(&self) -> i64 {
        duration_ms(self.projection_retention)
    }
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            snapshot_ttl: Self::FOUR_HOURS,
            projection_retention: Self::FOUR_HOURS,
        }
    }
}
