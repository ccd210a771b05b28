//! Error types for the projection service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Parlayer Error Enum ==
/// Unified error type for the projection service.
#[derive(Error, Debug)]
pub enum ParlayerError {
    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Upstream projections feed failed
    #[error("Feed error: {0}")]
    Feed(String),

    /// Key-value backend failure
    #[error("Store error: {0}")]
    Store(String),

    /// JSON encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// == IntoResponse Implementation ==
impl IntoResponse for ParlayerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ParlayerError::NotFound(_) => StatusCode::NOT_FOUND,
            ParlayerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ParlayerError::Feed(_) => StatusCode::BAD_GATEWAY,
            ParlayerError::Store(_)
            | ParlayerError::Serialization(_)
            | ParlayerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "success": false,
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for ParlayerError {
    fn from(err: reqwest::Error) -> Self {
        ParlayerError::Feed(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the projection service.
pub type Result<T> = std::result::Result<T, ParlayerError>;
