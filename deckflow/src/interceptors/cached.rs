//! Cache wrapper for operations.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::Operation;
use crate::cache::ResultCache;

type SkipPredicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Serves repeated calls from a [`ResultCache`].
///
/// Only `Ok` results are stored. A result matching the `skip_when`
/// predicate is returned but not stored.
pub struct CachedOperation<O: Operation> {
    inner: O,
    cache: Arc<ResultCache>,
    skip: Option<SkipPredicate<O::Output>>,
}

impl<O: Operation> CachedOperation<O> {
    /// Wraps `inner` with `cache`.
    pub fn new(inner: O, cache: Arc<ResultCache>) -> Self {
        Self {
            inner,
            cache,
            skip: None,
        }
    }

    /// Refuses to store results matching `predicate`.
    #[must_use]
    pub fn skip_when(mut self, predicate: impl Fn(&O::Output) -> bool + Send + Sync + 'static) -> Self {
        self.skip = Some(Arc::new(predicate));
        self
    }
}

impl<O: Operation> fmt::Debug for CachedOperation<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedOperation")
            .field("op", &self.inner.name())
            .field("skip_when", &self.skip.is_some())
            .finish()
    }
}

#[async_trait]
impl<O> Operation for CachedOperation<O>
where
    O: Operation,
    O::Output: Serialize + DeserializeOwned,
{
    type Args = O::Args;
    type Output = O::Output;
    type Error = O::Error;

    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn call(&self, args: &Self::Args) -> Result<Self::Output, Self::Error> {
        let skip = self.skip.as_ref();
        self.cache
            .get_or_try_compute_if(
                self.inner.name(),
                args,
                |value: &O::Output| skip.map_or(true, |skip| !skip(value)),
                || self.inner.call(args),
            )
            .await
    }
}

/// Wraps `inner` in a [`CachedOperation`].
pub fn cached<O: Operation>(inner: O, cache: Arc<ResultCache>) -> CachedOperation<O> {
    CachedOperation::new(inner, cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptors::{operation, retrying};
    use crate::pipeline::RetryPolicy;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn counting_search(calls: Arc<AtomicU32>) -> impl Operation<Args = String, Output = Vec<String>, Error = String> {
        operation("web_search", move |query: String| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, String>(vec![format!("result for {query}")]) }
        })
    }

    #[tokio::test]
    async fn test_identical_calls_run_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let op = cached(counting_search(calls.clone()), Arc::new(ResultCache::in_memory()));

        let first = op.call(&"rust".to_string()).await;
        let second = op.call(&"rust".to_string()).await;

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_skip_when_prevents_storing() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let op = cached(
            operation("web_search", move |_: String| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<Vec<String>, String>(Vec::new()) }
            }),
            Arc::new(ResultCache::in_memory()),
        )
        .skip_when(Vec::is_empty);

        let _ = op.call(&"q".to_string()).await;
        let _ = op.call(&"q".to_string()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_outside_retry_caches_only_final_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let flaky = operation("generate_outline", move |topic: String| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n == 1 {
                    Err("timeout".to_string())
                } else {
                    Ok(format!("outline of {topic}"))
                }
            }
        });
        let policy = RetryPolicy::new().with_initial_delay(Duration::from_millis(1));
        let op = cached(retrying(flaky, policy), Arc::new(ResultCache::in_memory()));

        assert_eq!(op.call(&"Rust".to_string()).await, Ok("outline of Rust".to_string()));
        assert_eq!(op.call(&"Rust".to_string()).await, Ok("outline of Rust".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
