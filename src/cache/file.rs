//! File Backend Module
//!
//! Durable key-value backend storing one JSON document per key in a
//! directory. Writes go to a temp file and are renamed into place, so a
//! crash never leaves a half-written value behind.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::{KvBackend, StoredValue};
use crate::error::Result;

/// Directory-backed [`KvBackend`].
///
/// Read-modify-write is serialised by an in-process lock; several processes
/// sharing one directory only get last-writer-wins.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
    /// Highest version issued by this process
    last_version: Mutex<u64>,
}

impl FileBackend {
    /// Opens (creating if needed) a backend rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        debug!(dir = %dir.display(), "Opened file backend");

        Ok(Self {
            dir,
            last_version: Mutex::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", name))
    }

    /// Reads the stored value. An undecodable file is removed and reads as
    /// absent, otherwise it would block every later write to the key.
    async fn read(&self, key: &str) -> Result<Option<StoredValue>> {
        let raw = match fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&raw) {
            Ok(stored) => Ok(Some(stored)),
            Err(e) => {
                warn!(key, error = %e, "Removing undecodable value file");
                self.remove(key).await?;
                Ok(None)
            }
        }
    }

    async fn write(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
        last_version: &mut u64,
        current: Option<&StoredValue>,
    ) -> Result<u64> {
        let version = (*last_version).max(current.map_or(0, |stored| stored.version)) + 1;
        *last_version = version;

        let stored = StoredValue::new(value, version, ttl);
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&stored)?).await?;
        fs::rename(&tmp, &path).await?;
        Ok(version)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl KvBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        let _guard = self.last_version.lock().await;
        match self.read(key).await? {
            Some(stored) if stored.is_expired() => {
                self.remove(key).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<u64> {
        let mut last_version = self.last_version.lock().await;
        let current = self.read(key).await.ok().flatten();
        self.write(key, value, ttl, &mut last_version, current.as_ref())
            .await
    }

    async fn put_if_version(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
        expected: Option<u64>,
    ) -> Result<bool> {
        let mut last_version = self.last_version.lock().await;
        let current = self.read(key).await?;
        let live = current
            .as_ref()
            .filter(|stored| !stored.is_expired())
            .map(|stored| stored.version);
        if live != expected {
            return Ok(false);
        }
        self.write(key, value, ttl, &mut last_version, current.as_ref())
            .await?;
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let _guard = self.last_version.lock().await;
        let existed = self
            .read(key)
            .await
            .ok()
            .flatten()
            .is_some_and(|stored| !stored.is_expired());
        self.remove(key).await?;
        Ok(existed)
    }

    async fn delete_if_version(&self, key: &str, expected: u64) -> Result<bool> {
        let _guard = self.last_version.lock().await;
        let live = self
            .read(key)
            .await?
            .filter(|stored| !stored.is_expired())
            .map(|stored| stored.version);
        if live != Some(expected) {
            return Ok(false);
        }
        self.remove(key).await?;
        Ok(true)
    }
}
