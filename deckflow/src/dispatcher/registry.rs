//! Named job functions.
//!
//! Closures cannot cross a broker boundary, so both the enqueueing side and
//! the worker side resolve jobs by name in a shared [`JobRegistry`].

use anyhow::Context;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

type JobFn = Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// Maps job names to type-erased async functions over JSON.
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: HashMap<String, JobFn>,
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("jobs", &self.names())
            .finish()
    }
}

impl JobRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `job` under `name`, replacing any previous registration.
    ///
    /// Arguments are decoded from JSON into `A` and the output is encoded
    /// back to JSON; a decode failure fails the job.
    pub fn register<A, T, F, Fut>(&mut self, name: impl Into<String>, job: F) -> &mut Self
    where
        A: DeserializeOwned + Send + 'static,
        T: Serialize + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let name = name.into();
        let job = Arc::new(job);
        let label = name.clone();
        let erased: JobFn = Arc::new(move |args: Value| -> BoxFuture<'static, anyhow::Result<Value>> {
            let job = Arc::clone(&job);
            let label = label.clone();
            Box::pin(async move {
                let args: A = serde_json::from_value(args)
                    .with_context(|| format!("invalid arguments for job '{label}'"))?;
                let output = (*job)(args).await?;
                serde_json::to_value(output)
                    .with_context(|| format!("unserializable result from job '{label}'"))
            })
        });
        self.jobs.insert(name, erased);
        self
    }

    /// Returns true if a job is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    /// Registered job names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.jobs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Runs the job registered under `name` with `args`.
    pub async fn execute(&self, name: &str, args: Value) -> anyhow::Result<Value> {
        let job = self
            .jobs
            .get(name)
            .cloned()
            .with_context(|| format!("unknown job '{name}'"))?;
        (*job)(args).await
    }
}
