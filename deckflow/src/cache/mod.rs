//! Content-addressed memoization of operation results.
//!
//! A result is keyed by the operation name plus its canonical serialized
//! arguments. The cache never fails a computation: store errors and corrupt
//! entries are logged, a corrupt entry is treated as a miss and overwritten,
//! and a failed write still returns the freshly computed value.

mod key;
mod store;

pub use key::CacheKey;
pub use store::{CacheEntry, CacheStore, DiskCacheStore, InMemoryCacheStore};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::errors::CacheError;

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the store.
    pub hits: u64,
    /// Lookups that had to compute.
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups that were hits, or 0.0 with no lookups.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Memoizes operation results in a [`CacheStore`].
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl ResultCache {
    /// Creates a cache over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a cache persisting under `dir`.
    #[must_use]
    pub fn on_disk(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(DiskCacheStore::open(dir)))
    }

    /// Creates a process-local cache.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCacheStore::new()))
    }

    /// Returns the hit/miss counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Removes every stored entry and returns how many were removed.
    pub async fn clear(&self) -> Result<usize, CacheError> {
        let removed = self.store.clear().await?;
        tracing::info!(removed, "Cache cleared");
        Ok(removed)
    }

    /// Returns the stored result for `op(args)`, computing and storing it on a miss.
    pub async fn get_or_compute<A, T, F, Fut>(&self, op: &str, args: &A, compute: F) -> T
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let key = self.key_for(op, args);
        if let Some(value) = self.lookup(op, key.as_ref()).await {
            return value;
        }
        let value = compute().await;
        if let Some(entry) = Self::entry_for(op, key.as_ref(), &value) {
            self.persist(op, entry).await;
        }
        value
    }

    /// Like [`Self::get_or_compute`] for fallible computations.
    ///
    /// An `Err` is returned to the caller and never stored, so the next call
    /// computes again.
    pub async fn get_or_try_compute<A, T, E, F, Fut>(
        &self,
        op: &str,
        args: &A,
        compute: F,
    ) -> Result<T, E>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_try_compute_if(op, args, |_: &T| true, compute).await
    }

    /// Like [`Self::get_or_try_compute`], storing an `Ok` value only if
    /// `should_store` accepts it.
    pub async fn get_or_try_compute_if<A, T, E, P, F, Fut>(
        &self,
        op: &str,
        args: &A,
        should_store: P,
        compute: F,
    ) -> Result<T, E>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        P: Fn(&T) -> bool,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = self.key_for(op, args);
        if let Some(value) = self.lookup(op, key.as_ref()).await {
            return Ok(value);
        }
        let value = compute().await?;
        if should_store(&value) {
            if let Some(entry) = Self::entry_for(op, key.as_ref(), &value) {
                self.persist(op, entry).await;
            }
        } else {
            tracing::debug!(op, "Result not cached");
        }
        Ok(value)
    }

    fn key_for<A>(&self, op: &str, args: &A) -> Option<CacheKey>
    where
        A: Serialize + ?Sized,
    {
        match CacheKey::derive(op, args) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!(op, error = %e, "Arguments not serializable, bypassing cache");
                None
            }
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, op: &str, key: Option<&CacheKey>) -> Option<T> {
        let key = key?;
        let found = match self.store.load(key).await {
            Ok(Some(entry)) => match serde_json::from_value(entry.value) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(op, key = %key, error = %e, "Cached value has wrong shape, recomputing");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(op, key = %key, error = %e, "Cache read failed, recomputing");
                None
            }
        };

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(op, key = %key, "Cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(op, key = %key, "Cache miss");
        }
        found
    }

    // No borrow of the value may be held across the store await.
    fn entry_for<T: Serialize>(op: &str, key: Option<&CacheKey>, value: &T) -> Option<(CacheKey, CacheEntry)> {
        let key = key?;
        match serde_json::to_value(value) {
            Ok(json) => Some((key.clone(), CacheEntry::new(op, json))),
            Err(e) => {
                tracing::warn!(op, key = %key, error = %e, "Result not serializable, not cached");
                None
            }
        }
    }

    async fn persist(&self, op: &str, (key, entry): (CacheKey, CacheEntry)) {
        if let Err(e) = self.store.save(&key, &entry).await {
            tracing::warn!(op, key = %key, error = %e, "Cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let cache = ResultCache::in_memory();
        let calls = AtomicU32::new(0);
        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            vec!["a".to_string(), "b".to_string()]
        };

        let first: Vec<String> = cache.get_or_compute("op", &"args", compute).await;
        let second: Vec<String> = cache
            .get_or_compute("op", &"args", || async { Vec::new() })
            .await;

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[tokio::test]
    async fn test_different_args_are_different_entries() {
        let cache = ResultCache::in_memory();
        let a: u32 = cache.get_or_compute("op", &1, || async { 10 }).await;
        let b: u32 = cache.get_or_compute("op", &2, || async { 20 }).await;
        assert_eq!((a, b), (10, 20));
    }

    #[tokio::test]
    async fn test_errors_are_never_stored() {
        let cache = ResultCache::in_memory();

        let failed: Result<String, String> = cache
            .get_or_try_compute("op", &"x", || async { Err("boom".to_string()) })
            .await;
        assert_eq!(failed, Err("boom".to_string()));

        let retried: Result<String, String> = cache
            .get_or_try_compute("op", &"x", || async { Ok("fresh".to_string()) })
            .await;
        assert_eq!(retried, Ok("fresh".to_string()));
        assert_eq!(cache.stats().hits, 0);
    }

    #[tokio::test]
    async fn test_rejected_values_are_not_stored() {
        let cache = ResultCache::in_memory();
        let skip_empty = |v: &Vec<u8>| !v.is_empty();

        let _: Result<Vec<u8>, ()> = cache
            .get_or_try_compute_if("op", &"x", skip_empty, || async { Ok(Vec::new()) })
            .await;
        let second: Result<Vec<u8>, ()> = cache
            .get_or_try_compute_if("op", &"x", skip_empty, || async { Ok(vec![1]) })
            .await;

        assert_eq!(second, Ok(vec![1]));
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_recomputed_and_overwritten() {
        let store = Arc::new(InMemoryCacheStore::new());
        let cache = ResultCache::new(store.clone());
        let key = CacheKey::derive("op", &"x").unwrap();
        store.insert_raw(key.clone(), "not json");

        let value: String = cache.get_or_compute("op", &"x", || async { "v".to_string() }).await;
        assert_eq!(value, "v");

        let repaired = store.load(&key).await.unwrap().unwrap();
        assert_eq!(repaired.value, serde_json::json!("v"));
    }

    #[tokio::test]
    async fn test_unwritable_store_still_returns_value() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not a directory").unwrap();
        let cache = ResultCache::on_disk(&blocker);

        let value: u32 = cache.get_or_compute("op", &"x", || async { 7 }).await;
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_disk_cache_survives_new_instance() {
        let dir = TempDir::new().unwrap();
        let first = ResultCache::on_disk(dir.path());
        let _: String = first
            .get_or_compute("generate_outline", &("Rust", 3), || async { "outline".to_string() })
            .await;

        let second = ResultCache::on_disk(dir.path());
        let cached: String = second
            .get_or_compute("generate_outline", &("Rust", 3), || async { "other".to_string() })
            .await;

        assert_eq!(cached, "outline");
        assert_eq!(second.clear().await.unwrap(), 1);
    }

    #[test]
    fn test_hit_rate() {
        assert!((CacheStats { hits: 3, misses: 1 }.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert!(CacheStats::default().hit_rate().abs() < f64::EPSILON);
    }
}
