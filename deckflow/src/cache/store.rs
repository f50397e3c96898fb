//! Cache storage backends.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

use super::CacheKey;
use crate::errors::CacheError;
use crate::utils::{generate_uuid, Timestamp};

/// One persisted operation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Operation that produced the value.
    pub op: String,
    /// When the value was stored.
    pub created_at: Timestamp,
    /// The result, as JSON.
    pub value: serde_json::Value,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(op: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            op: op.into(),
            created_at: chrono::Utc::now(),
            value,
        }
    }
}

/// A key/value backend for [`super::ResultCache`].
///
/// `load` distinguishes a missing entry (`Ok(None)`) from one that exists but
/// cannot be decoded (`Err(CacheError::Corrupt)`).
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Reads an entry.
    async fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;

    /// Writes an entry, replacing any previous one.
    async fn save(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), CacheError>;

    /// Removes every entry and returns how many were removed.
    async fn clear(&self) -> Result<usize, CacheError>;
}

/// Stores one `{key}.json` file per entry under a directory.
///
/// Writes go to a temporary file that is then renamed over the target, so a
/// reader sees either the old entry or the new one.
#[derive(Debug, Clone)]
pub struct DiskCacheStore {
    root: PathBuf,
}

impl DiskCacheStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// A directory that cannot be created is logged; every later write will
    /// then fail and be logged too, but reads and computations still work.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        if let Err(e) = std::fs::create_dir_all(&root) {
            tracing::warn!(dir = %root.display(), error = %e, "Could not create cache directory");
        }
        Self { root }
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file backing `key`.
    #[must_use]
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

#[async_trait]
impl CacheStore for DiskCacheStore {
    async fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let raw = match tokio::fs::read(self.entry_path(key)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| CacheError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn save(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), CacheError> {
        let body = serde_json::to_vec(entry)?;
        tokio::fs::create_dir_all(&self.root).await?;

        let tmp = self.root.join(format!(".{key}.{}.tmp", generate_uuid().simple()));
        tokio::fs::write(&tmp, &body).await?;
        if let Err(e) = tokio::fs::rename(&tmp, self.entry_path(key)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn clear(&self) -> Result<usize, CacheError> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            match path.extension().and_then(|ext| ext.to_str()) {
                Some("json") => {
                    tokio::fs::remove_file(&path).await?;
                    removed += 1;
                }
                // Leftovers of interrupted saves.
                Some("tmp") => match tokio::fs::remove_file(&path).await {
                    Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
                    _ => {}
                },
                _ => {}
            }
        }
        Ok(removed)
    }
}

/// Keeps serialized entries in memory.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: DashMap<CacheKey, String>,
}

impl InMemoryCacheStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stores raw text under `key`, bypassing serialization.
    pub fn insert_raw(&self, key: CacheKey, raw: impl Into<String>) {
        self.entries.insert(key, raw.into());
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let Some(raw) = self.entries.get(key).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CacheError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn save(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), CacheError> {
        self.entries.insert(key.clone(), serde_json::to_string(entry)?);
        Ok(())
    }

    async fn clear(&self) -> Result<usize, CacheError> {
        let removed = self.entries.len();
        self.entries.clear();
        Ok(removed)
    }
}
