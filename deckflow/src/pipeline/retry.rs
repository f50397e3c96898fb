//! Backoff retry for fallible async operations.
//!
//! An operation is re-invoked on failure up to `max_attempts` total tries,
//! waiting `initial_delay * multiplier^(attempt - 1)` after failed attempt
//! `attempt`. The final error is returned unmodified. All state lives inside
//! a single [`with_retry`] call.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Jitter strategy applied on top of the computed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// Exact delays.
    #[default]
    None,
    /// Random from 0 to delay.
    Full,
    /// Half fixed, half random.
    Equal,
}

impl JitterStrategy {
    /// Applies jitter to a delay in milliseconds.
    #[must_use]
    pub fn apply(&self, delay_ms: u64) -> u64 {
        match self {
            Self::None => delay_ms,
            Self::Full => {
                if delay_ms == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay_ms)
                }
            }
            Self::Equal => {
                let half = delay_ms / 2;
                if half == 0 {
                    delay_ms
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
        }
    }
}

/// What a retry hook observes about one failed, non-final attempt.
pub struct RetryAttempt<'a> {
    /// 1-based number of the attempt that failed.
    pub attempt: u32,
    /// Total attempts allowed.
    pub max_attempts: u32,
    /// The failure.
    pub error: &'a dyn fmt::Display,
    /// How long the wrapper waits before the next attempt.
    pub wait: Duration,
}

/// Callback invoked before each retry sleep.
#[derive(Clone)]
pub struct RetryHook(Arc<dyn Fn(&RetryAttempt<'_>) + Send + Sync>);

impl RetryHook {
    /// Wraps a callback.
    pub fn new(hook: impl Fn(&RetryAttempt<'_>) + Send + Sync + 'static) -> Self {
        Self(Arc::new(hook))
    }

    fn call(&self, attempt: &RetryAttempt<'_>) {
        (self.0)(attempt);
    }
}

impl fmt::Debug for RetryHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RetryHook(..)")
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt, in milliseconds.
    pub initial_delay_ms: u64,
    /// Growth factor applied per further failure.
    pub multiplier: f64,
    /// Upper bound on a single delay, in milliseconds.
    pub max_delay_ms: Option<u64>,
    /// Jitter strategy.
    pub jitter: JitterStrategy,
    /// Optional observer for failed attempts.
    #[serde(skip)]
    pub on_retry: Option<RetryHook>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 2000,
            multiplier: 2.0,
            max_delay_ms: Some(10_000),
            jitter: JitterStrategy::None,
            on_retry: None,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy that tries exactly once.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::default().with_max_attempts(1)
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the multiplier.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the maximum single delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Option<Duration>) -> Self {
        self.max_delay_ms = delay.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Installs a retry observer.
    #[must_use]
    pub fn with_hook(mut self, hook: impl Fn(&RetryAttempt<'_>) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(RetryHook::new(hook));
        self
    }

    /// Effective number of attempts.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Computes the wait after failed attempt `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        #[allow(clippy::cast_precision_loss)]
        let raw = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
        let capped = match self.max_delay_ms {
            #[allow(clippy::cast_precision_loss)]
            Some(max) => raw.min(max as f64),
            None => raw,
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delay_ms = if capped.is_finite() && capped > 0.0 {
            capped.min(u64::MAX as f64) as u64
        } else if capped.is_infinite() {
            u64::MAX
        } else {
            0
        };
        Duration::from_millis(self.jitter.apply(delay_ms))
    }

    fn notify(&self, attempt: &RetryAttempt<'_>) {
        tracing::warn!(
            attempt = attempt.attempt,
            max_attempts = attempt.max_attempts,
            wait_ms = u64::try_from(attempt.wait.as_millis()).unwrap_or(u64::MAX),
            error = %attempt.error,
            "Attempt failed, retrying"
        );
        if let Some(hook) = &self.on_retry {
            hook.call(attempt);
        }
    }
}

/// Retries `operation` on every failure.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    with_retry_when(policy, |_: &E| true, operation).await
}

/// Retries `operation` only while `is_retryable` accepts the failure.
///
/// A failure the classifier rejects is returned immediately.
pub async fn with_retry_when<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    is_retryable: C,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
    C: Fn(&E) -> bool,
{
    let max_attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= max_attempts {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        error = %error,
                        "Retries exhausted"
                    );
                    return Err(error);
                }
                if !is_retryable(&error) {
                    tracing::debug!(attempt, error = %error, "Failure is not retryable");
                    return Err(error);
                }

                let wait = policy.delay_for(attempt);
                policy.notify(&RetryAttempt {
                    attempt,
                    max_attempts,
                    error: &error,
                    wait,
                });
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}
