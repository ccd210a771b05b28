//! Domain and transfer models for the projection service
//!
//! Projections as the feed delivers them, the envelopes they travel in,
//! and the DTOs serialized as HTTP response bodies.

pub mod envelope;
pub mod projection;
pub mod responses;

// Re-export commonly used types
pub use envelope::{ProjectionBatch, ProjectionEnvelope, RawEnvelope};
pub use projection::{Direction, LineMovement, Projection, ProjectionAttributes, ProjectionStatus};
pub use responses::{
    ClearResponse, HealthResponse, ProjectionsResponse, StatsResponse, SweepResponse,
};
