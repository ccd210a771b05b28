//! Upstream projections feed
//!
//! The tracker never fetches anything itself; callers hand it batches
//! obtained through a [`ProjectionFeed`].

mod http;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ProjectionBatch;

pub use http::HttpFeed;

/// Source of fresh projection batches.
#[async_trait]
pub trait ProjectionFeed: Send + Sync {
    /// Fetches the current board, already validated item by item.
    async fn fetch(&self) -> Result<ProjectionBatch>;
}
