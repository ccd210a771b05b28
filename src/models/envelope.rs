//! Feed envelopes
//!
//! The upstream feed and the reconcile endpoint both speak the same
//! `{ data: [...], included: [...] }` shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{ParlayerError, Result};
use crate::models::Projection;

// == Raw Envelope ==
/// Envelope as received, before per-item validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEnvelope {
    pub data: Vec<Value>,
    #[serde(default)]
    pub included: Vec<Value>,
}

impl RawEnvelope {
    /// Interprets an arbitrary JSON body as an envelope.
    ///
    /// Only the outer shape is checked here; individual items are validated
    /// by [`RawEnvelope::into_batch`].
    pub fn from_json(body: Value) -> Result<Self> {
        if !body.is_object() {
            return Err(ParlayerError::InvalidRequest(
                "body must be an object with a `data` array".to_string(),
            ));
        }
        match body.get("data") {
            Some(data) if data.is_array() => {}
            Some(_) => {
                return Err(ParlayerError::InvalidRequest(
                    "`data` must be an array".to_string(),
                ))
            }
            None => {
                return Err(ParlayerError::InvalidRequest(
                    "body is missing the `data` array".to_string(),
                ))
            }
        }
        if let Some(included) = body.get("included") {
            if !included.is_array() && !included.is_null() {
                return Err(ParlayerError::InvalidRequest(
                    "`included` must be an array".to_string(),
                ));
            }
        }

        let mut body = body;
        if body.get("included").is_some_and(Value::is_null) {
            if let Some(obj) = body.as_object_mut() {
                obj.remove("included");
            }
        }
        Ok(serde_json::from_value(body)?)
    }

    /// Validates each item, dropping the malformed ones.
    pub fn into_batch(self) -> ProjectionBatch {
        let mut data = Vec::with_capacity(self.data.len());
        let mut skipped = 0;

        for item in self.data {
            match Projection::from_value(item) {
                Ok(projection) => data.push(projection),
                Err(reason) => {
                    skipped += 1;
                    warn!(%reason, "Skipping malformed projection");
                }
            }
        }

        ProjectionBatch {
            data,
            included: self.included,
            skipped,
        }
    }
}

// == Projection Batch ==
/// A validated batch ready for reconciliation.
#[derive(Debug, Clone, Default)]
pub struct ProjectionBatch {
    pub data: Vec<Projection>,
    /// Referenced players and stat averages, never interpreted here
    pub included: Vec<Value>,
    /// Number of feed items dropped during validation
    pub skipped: usize,
}

// == Projection Envelope ==
/// Outgoing envelope: projections, optionally annotated with line movement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectionEnvelope {
    pub data: Vec<Projection>,
    pub included: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn good_item(id: &str) -> Value {
        json!({
            "type": "projection",
            "id": id,
            "attributes": {
                "line_score": 5.5,
                "stat_type": "Rebounds",
                "start_time": "2024-03-01T19:30:00Z",
                "status": "pre_game"
            }
        })
    }

    #[test]
    fn test_into_batch_skips_malformed() {
        let envelope = RawEnvelope {
            data: vec![
                good_item("1"),
                json!({ "id": "2" }),
                good_item("3"),
                json!("garbage"),
            ],
            included: vec![json!({ "type": "new_player", "id": "9" })],
        };

        let batch = envelope.into_batch();
        assert_eq!(batch.data.len(), 2);
        assert_eq!(batch.skipped, 2);
        assert_eq!(batch.data[0].id, "1");
        assert_eq!(batch.data[1].id, "3");
        assert_eq!(batch.included.len(), 1);
    }

    #[test]
    fn test_from_json_defaults_missing_included() {
        let envelope = RawEnvelope::from_json(json!({ "data": [good_item("1")] })).unwrap();
        assert_eq!(envelope.data.len(), 1);
        assert!(envelope.included.is_empty());
    }

    #[test]
    fn test_from_json_accepts_null_included() {
        let envelope =
            RawEnvelope::from_json(json!({ "data": [], "included": null })).unwrap();
        assert!(envelope.included.is_empty());
    }

    #[test]
    fn test_from_json_rejects_non_array_data() {
        let result = RawEnvelope::from_json(json!({ "data": { "id": "1" } }));
        assert!(matches!(result, Err(ParlayerError::InvalidRequest(_))));
    }

    #[test]
    fn test_from_json_rejects_missing_data() {
        let result = RawEnvelope::from_json(json!({ "included": [] }));
        assert!(matches!(result, Err(ParlayerError::InvalidRequest(_))));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        let result = RawEnvelope::from_json(json!([1, 2, 3]));
        assert!(matches!(result, Err(ParlayerError::InvalidRequest(_))));
    }
}
