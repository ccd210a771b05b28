//! Key-Value Backend Module
//!
//! The narrow storage interface the snapshot store is written against, and
//! the in-memory implementation used by default and in tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::StoredValue;
use crate::error::Result;

// == Backend Trait ==
/// A versioned key-value store with TTL and compare-and-swap.
///
/// Versions are strictly increasing across the whole backend, so a key that
/// is deleted and recreated never reuses an older version.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Returns the live value for `key`. Expired values read as absent.
    async fn get(&self, key: &str) -> Result<Option<StoredValue>>;

    /// Writes `value` unconditionally, returning the new version.
    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<u64>;

    /// Writes `value` only if the current version matches `expected`
    /// (`None` = key must be absent). Returns whether the write happened.
    async fn put_if_version(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
        expected: Option<u64>,
    ) -> Result<bool>;

    /// Removes `key`. Returns whether a live value was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Removes `key` only if its live version is `expected`.
    async fn delete_if_version(&self, key: &str, expected: u64) -> Result<bool>;
}

// == Memory Backend ==
#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, StoredValue>,
    last_version: u64,
}

impl MemoryInner {
    fn live_version(&self, key: &str) -> Option<u64> {
        self.entries
            .get(key)
            .filter(|stored| !stored.is_expired())
            .map(|stored| stored.version)
    }

    fn write(&mut self, key: &str, value: String, ttl: Option<Duration>) -> u64 {
        self.last_version += 1;
        let version = self.last_version;
        self.entries
            .insert(key.to_string(), StoredValue::new(value, version, ttl));
        version
    }
}

/// Process-local backend over a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: RwLock<MemoryInner>,
}

impl MemoryBackend {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Length ==
    /// Returns the number of stored keys, expired or not.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        {
            let inner = self.inner.read().await;
            match inner.entries.get(key) {
                None => return Ok(None),
                Some(stored) if !stored.is_expired() => return Ok(Some(stored.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it, unless a writer replaced it in between
        let mut inner = self.inner.write().await;
        if inner.entries.get(key).is_some_and(StoredValue::is_expired) {
            inner.entries.remove(key);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<u64> {
        let mut inner = self.inner.write().await;
        Ok(inner.write(key, value, ttl))
    }

    async fn put_if_version(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
        expected: Option<u64>,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.live_version(key) != expected {
            return Ok(false);
        }
        inner.write(key, value, ttl);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .entries
            .remove(key)
            .is_some_and(|stored| !stored.is_expired()))
    }

    async fn delete_if_version(&self, key: &str, expected: u64) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.live_version(key) != Some(expected) {
            return Ok(false);
        }
        inner.entries.remove(key);
        Ok(true)
    }
}
