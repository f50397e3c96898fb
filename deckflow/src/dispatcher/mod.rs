//! Job dispatch with graceful fallback to inline execution.
//!
//! [`JobDispatcher`] decides once, at construction, whether a broker is
//! reachable. If it is, jobs are queued for a [`Worker`]; otherwise they run
//! inline in the caller's task. Callers get a [`JobHandle`] either way and
//! never branch on the mode.

mod broker;
mod handle;
mod job;
#[cfg(feature = "redis")]
mod redis;
mod registry;
mod worker;

pub use broker::{InMemoryBroker, JobBroker};
pub use handle::JobHandle;
pub use job::{JobRecord, JobRequest, JobStatus};
#[cfg(feature = "redis")]
pub use self::redis::RedisBroker;
pub use registry::JobRegistry;
pub use worker::Worker;

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::errors::DispatchError;
use crate::pipeline::{run_pipeline, PipelineRequest, PipelineRunner};

/// Job name under which [`register_pipeline_job`] registers the pipeline.
pub const PIPELINE_JOB: &str = "run_pipeline";

/// How enqueued jobs are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Queued on a broker for a worker.
    Queued,
    /// Run inline by the caller.
    Inline,
}

/// Enqueues registered jobs on a broker, or runs them inline.
pub struct JobDispatcher {
    registry: Arc<JobRegistry>,
    broker: Option<Arc<dyn JobBroker>>,
}

impl std::fmt::Debug for JobDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobDispatcher")
            .field("mode", &self.mode())
            .field("registry", &self.registry)
            .finish()
    }
}

impl JobDispatcher {
    /// Probes `broker` once and commits to a mode for the dispatcher's lifetime.
    pub async fn connect(
        registry: Arc<JobRegistry>,
        broker: Option<Arc<dyn JobBroker>>,
        probe_timeout: Duration,
    ) -> Self {
        let Some(broker) = broker else {
            tracing::info!("No broker configured, jobs will run inline");
            return Self { registry, broker: None };
        };

        let probe = tokio::time::timeout(probe_timeout, broker.ping()).await;
        let broker = match probe {
            Ok(Ok(())) => {
                tracing::info!(backend = broker.backend(), "Broker reachable, jobs will be queued");
                Some(broker)
            }
            Ok(Err(e)) => {
                tracing::warn!(backend = broker.backend(), error = %e, "Broker unreachable, jobs will run inline");
                None
            }
            Err(_) => {
                tracing::warn!(
                    backend = broker.backend(),
                    timeout_ms = u64::try_from(probe_timeout.as_millis()).unwrap_or(u64::MAX),
                    "Broker probe timed out, jobs will run inline"
                );
                None
            }
        };
        Self { registry, broker }
    }

    /// Builds a dispatcher from [`Settings::broker_url`].
    pub async fn from_settings(registry: Arc<JobRegistry>, settings: &Settings) -> Self {
        let broker = match settings.broker_url.as_deref() {
            None => None,
            Some(url) => connect_broker(url, settings).await,
        };
        Self::connect(registry, broker, settings.broker_timeout()).await
    }

    /// The mode chosen at construction.
    #[must_use]
    pub fn mode(&self) -> DispatchMode {
        if self.broker.is_some() {
            DispatchMode::Queued
        } else {
            DispatchMode::Inline
        }
    }

    /// The registry jobs are resolved against.
    #[must_use]
    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Dispatches the job registered as `name`.
    ///
    /// Returns the handle and whether the job was queued. Only an unknown
    /// job name or unserializable arguments are errors; a failing job or a
    /// failed submit produces a failed handle.
    pub async fn enqueue<A>(&self, name: &str, args: &A) -> Result<(JobHandle, bool), DispatchError>
    where
        A: Serialize + ?Sized,
    {
        if !self.registry.contains(name) {
            return Err(DispatchError::UnknownJob(name.to_string()));
        }
        let request = JobRequest::new(name, serde_json::to_value(args)?);

        let Some(broker) = &self.broker else {
            tracing::debug!(job_id = %request.id, job = name, "Running job inline");
            let outcome = self.registry.execute(name, request.args.clone()).await;
            let record = JobRecord::queued(&request).started().complete(outcome);
            if let Some(error) = &record.error {
                tracing::error!(job_id = %record.id, job = name, error = %error, "Inline job failed");
            }
            return Ok((JobHandle::resolved(record), false));
        };

        match broker.submit(&request).await {
            Ok(()) => {
                tracing::info!(job_id = %request.id, job = name, "Job queued");
                Ok((JobHandle::remote(JobRecord::queued(&request), Arc::clone(broker)), true))
            }
            Err(e) => {
                tracing::error!(job_id = %request.id, job = name, error = %e, "Job submit failed");
                let record = JobRecord::queued(&request).failed(e.to_string());
                Ok((JobHandle::resolved(record), true))
            }
        }
    }
}

#[cfg(feature = "redis")]
async fn connect_broker(url: &str, settings: &Settings) -> Option<Arc<dyn JobBroker>> {
    match RedisBroker::connect(url, &settings.queue, settings.broker_timeout()).await {
        Ok(broker) => Some(Arc::new(broker)),
        Err(e) => {
            tracing::warn!(error = %e, "Could not connect to broker");
            None
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn connect_broker(_url: &str, _settings: &Settings) -> Option<Arc<dyn JobBroker>> {
    tracing::warn!("Broker URL configured but built without the `redis` feature");
    None
}

/// Registers the presentation pipeline as job [`PIPELINE_JOB`].
///
/// The job takes a [`PipelineRequest`] and returns the final
/// [`crate::state::PipelineState`]; a rejected request fails the job.
pub fn register_pipeline_job(registry: &mut JobRegistry, runner: Arc<PipelineRunner>) {
    registry.register(PIPELINE_JOB, move |request: PipelineRequest| {
        let runner = Arc::clone(&runner);
        async move { Ok(run_pipeline(&runner, &request).await?) }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{PipelineState, StateUpdate};
    use crate::testing::MockStage;
    use serde_json::json;

    fn registry() -> Arc<JobRegistry> {
        let mut registry = JobRegistry::new();
        registry.register("add", |(a, b): (i64, i64)| async move { Ok(a + b) });
        Arc::new(registry)
    }

    async fn queued_dispatcher() -> (JobDispatcher, Arc<InMemoryBroker>) {
        let broker = Arc::new(InMemoryBroker::new());
        let dispatcher =
            JobDispatcher::connect(registry(), Some(broker.clone()), Duration::from_millis(50)).await;
        (dispatcher, broker)
    }

    #[tokio::test]
    async fn test_same_result_in_both_modes() {
        let (queued, broker) = queued_dispatcher().await;
        let (mut handle, was_queued) = queued.enqueue("add", &(40, 2)).await.unwrap();
        assert!(was_queued);
        assert!(!handle.is_finished());
        Worker::new(broker, queued.registry().clone())
            .run_until_idle()
            .await
            .unwrap();
        handle.wait(Duration::from_millis(1), Some(Duration::from_secs(1))).await.unwrap();
        let queued_result = handle.result_as::<i64>().unwrap();

        let inline = JobDispatcher::connect(
            registry(),
            Some(Arc::new(InMemoryBroker::unreachable())),
            Duration::from_millis(50),
        )
        .await;
        assert_eq!(inline.mode(), DispatchMode::Inline);
        let (handle, was_queued) = inline.enqueue("add", &(40, 2)).await.unwrap();
        assert!(!was_queued);
        assert!(handle.is_finished());

        assert_eq!(queued_result, Some(42));
        assert_eq!(handle.result_as::<i64>().unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_mode_is_fixed_at_construction() {
        let (dispatcher, broker) = queued_dispatcher().await;
        assert_eq!(dispatcher.mode(), DispatchMode::Queued);

        broker.set_reachable(false);
        let (handle, was_queued) = dispatcher.enqueue("add", &(1, 1)).await.unwrap();

        assert_eq!(dispatcher.mode(), DispatchMode::Queued);
        assert!(was_queued);
        assert!(handle.is_failed());
    }

    #[tokio::test]
    async fn test_no_broker_runs_inline() {
        let dispatcher = JobDispatcher::connect(registry(), None, Duration::from_millis(50)).await;
        assert_eq!(dispatcher.mode(), DispatchMode::Inline);
    }

    #[tokio::test]
    async fn test_unknown_job_is_an_error_in_both_modes() {
        let (queued, _) = queued_dispatcher().await;
        let inline = JobDispatcher::connect(registry(), None, Duration::from_millis(50)).await;

        for dispatcher in [&queued, &inline] {
            let err = dispatcher.enqueue("nope", &json!(null)).await.unwrap_err();
            assert!(matches!(err, DispatchError::UnknownJob(name) if name == "nope"));
        }
    }

    #[tokio::test]
    async fn test_inline_job_failure_is_a_failed_handle() {
        let dispatcher = JobDispatcher::connect(registry(), None, Duration::from_millis(50)).await;
        let (handle, _) = dispatcher.enqueue("add", &"not a pair").await.unwrap();

        assert!(handle.is_failed());
        assert!(handle.error().unwrap().contains("invalid arguments"));
    }

    #[tokio::test]
    async fn test_settings_without_broker_url_run_inline() {
        let settings = Settings::default();
        let dispatcher = JobDispatcher::from_settings(registry(), &settings).await;
        assert_eq!(dispatcher.mode(), DispatchMode::Inline);
    }

    #[tokio::test]
    async fn test_pipeline_job_runs_inline() {
        let stage = MockStage::returning("render", StateUpdate::output_path("deck.pptx"));
        let runner = PipelineRunner::builder("jobs")
            .stage(Arc::new(stage))
            .build()
            .unwrap();
        let mut registry = JobRegistry::new();
        register_pipeline_job(&mut registry, Arc::new(runner));
        let dispatcher = JobDispatcher::connect(Arc::new(registry), None, Duration::from_millis(50)).await;

        let (handle, _) = dispatcher
            .enqueue(PIPELINE_JOB, &PipelineRequest::new("Rust Ownership"))
            .await
            .unwrap();
        let state: PipelineState = handle.result_as().unwrap().unwrap();
        assert_eq!(state.output_path, "deck.pptx");
        assert_eq!(state.topic, "Rust Ownership");

        let (rejected, _) = dispatcher
            .enqueue(PIPELINE_JOB, &PipelineRequest::new("x"))
            .await
            .unwrap();
        assert!(rejected.is_failed());
    }
}
