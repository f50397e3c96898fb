//! Retry wrapper for operations.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

use super::Operation;
use crate::pipeline::{with_retry, with_retry_when, RetryPolicy};

type Classifier<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Re-invokes the inner operation according to a [`RetryPolicy`].
///
/// Without a classifier every failure is retried.
pub struct RetryOperation<O: Operation> {
    inner: O,
    policy: RetryPolicy,
    classifier: Option<Classifier<O::Error>>,
}

impl<O: Operation> RetryOperation<O> {
    /// Wraps `inner` with `policy`.
    pub fn new(inner: O, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            classifier: None,
        }
    }

    /// Retries only failures `is_retryable` accepts.
    #[must_use]
    pub fn retry_if(mut self, is_retryable: impl Fn(&O::Error) -> bool + Send + Sync + 'static) -> Self {
        self.classifier = Some(Arc::new(is_retryable));
        self
    }

    /// Returns the policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<O: Operation> fmt::Debug for RetryOperation<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOperation")
            .field("op", &self.inner.name())
            .field("policy", &self.policy)
            .field("classified", &self.classifier.is_some())
            .finish()
    }
}

#[async_trait]
impl<O: Operation> Operation for RetryOperation<O> {
    type Args = O::Args;
    type Output = O::Output;
    type Error = O::Error;

    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn call(&self, args: &Self::Args) -> Result<Self::Output, Self::Error> {
        let span = tracing::debug_span!("retry", op = self.inner.name());
        match &self.classifier {
            Some(classifier) => {
                with_retry_when(&self.policy, |e: &O::Error| classifier(e), || self.inner.call(args))
                    .instrument(span)
                    .await
            }
            None => {
                with_retry(&self.policy, || self.inner.call(args))
                    .instrument(span)
                    .await
            }
        }
    }
}

/// Wraps `inner` in a [`RetryOperation`].
pub fn retrying<O: Operation>(inner: O, policy: RetryPolicy) -> RetryOperation<O> {
    RetryOperation::new(inner, policy)
}
