//! Stored Value Module
//!
//! Defines the envelope a key-value backend keeps for each key: the
//! serialized value, a write version for compare-and-swap, and an optional
//! expiry.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// == Stored Value ==
/// A single backend value with version and expiry metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredValue {
    /// The stored value
    pub value: String,
    /// Write version, strictly increasing per backend
    pub version: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<i64>,
}

impl StoredValue {
    // == Constructor ==
    /// Creates a new stored value with optional TTL.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `version` - Version assigned by the backend
    /// * `ttl` - Optional time to live
    pub fn new(value: String, version: u64, ttl: Option<Duration>) -> Self {
        let now = current_timestamp_ms();
        let expires_at = ttl.map(|ttl| now.saturating_add(duration_ms(ttl)));

        Self {
            value,
            version,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the value has expired.
    ///
    /// A value is expired once the current time is greater than or equal to
    /// its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Converts a duration to whole milliseconds, saturating at `i64::MAX`.
pub fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_value_creation_no_ttl() {
        let stored = StoredValue::new("payload".to_string(), 1, None);

        assert_eq!(stored.value, "payload");
        assert_eq!(stored.version, 1);
        assert!(stored.expires_at.is_none());
        assert!(!stored.is_expired());
    }

    #[test]
    fn test_value_creation_with_ttl() {
        let stored = StoredValue::new("payload".to_string(), 1, Some(Duration::from_secs(60)));

        assert!(stored.expires_at.is_some());
        assert!(!stored.is_expired());

        let remaining = stored.expires_at.unwrap() - current_timestamp_ms();
        assert!(remaining <= 60_000);
        assert!(remaining >= 59_000);
    }

    #[test]
    fn test_value_expiration() {
        let stored = StoredValue::new("payload".to_string(), 1, Some(Duration::from_millis(50)));

        assert!(!stored.is_expired());
        sleep(Duration::from_millis(80));
        assert!(stored.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = current_timestamp_ms();
        let stored = StoredValue {
            value: "payload".to_string(),
            version: 1,
            expires_at: Some(now),
        };

        assert!(stored.is_expired_at(now), "Value should be expired at boundary");
        assert!(!stored.is_expired_at(now - 1));
    }

    #[test]
    fn test_duration_ms_saturates() {
        assert_eq!(duration_ms(Duration::from_secs(2)), 2_000);
        assert_eq!(duration_ms(Duration::MAX), i64::MAX);
    }
}
