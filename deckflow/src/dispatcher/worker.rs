//! Queue consumer that executes registered jobs.

use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use super::broker::JobBroker;
use super::job::JobRecord;
use super::registry::JobRegistry;
use crate::errors::DispatchError;

/// Pulls requests from a broker and runs them through a registry.
#[derive(Clone)]
pub struct Worker {
    broker: Arc<dyn JobBroker>,
    registry: Arc<JobRegistry>,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("backend", &self.broker.backend())
            .field("registry", &self.registry)
            .finish()
    }
}

impl Worker {
    /// Creates a worker.
    #[must_use]
    pub fn new(broker: Arc<dyn JobBroker>, registry: Arc<JobRegistry>) -> Self {
        Self { broker, registry }
    }

    /// Executes at most one queued job. Returns whether a job was taken.
    pub async fn run_once(&self) -> Result<bool, DispatchError> {
        let Some(request) = self.broker.take_next().await? else {
            return Ok(false);
        };

        tracing::info!(job_id = %request.id, job = %request.name, "Job started");
        let span = tracing::info_span!("job", job_id = %request.id, job = %request.name);
        let outcome = self
            .registry
            .execute(&request.name, request.args.clone())
            .instrument(span)
            .await;
        let record = JobRecord::queued(&request).started().complete(outcome);

        match &record.error {
            None => tracing::info!(job_id = %record.id, job = %record.name, "Job finished"),
            Some(error) => {
                tracing::error!(job_id = %record.id, job = %record.name, error = %error, "Job failed");
            }
        }

        self.broker.complete(&record).await?;
        Ok(true)
    }

    /// Executes queued jobs until the queue is empty. Returns how many ran.
    pub async fn run_until_idle(&self) -> Result<usize, DispatchError> {
        let mut processed = 0;
        while self.run_once().await? {
            processed += 1;
        }
        Ok(processed)
    }

    /// Polls forever, sleeping `poll_interval` whenever the queue is empty.
    ///
    /// Broker errors are logged and polling continues.
    pub async fn run(&self, poll_interval: Duration) {
        tracing::info!(backend = self.broker.backend(), jobs = ?self.registry.names(), "Worker started");
        loop {
            match self.run_once().await {
                Ok(true) => {}
                Ok(false) => tokio::time::sleep(poll_interval).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Worker poll failed");
                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{InMemoryBroker, JobRequest, JobStatus};
    use serde_json::json;

    fn registry() -> Arc<JobRegistry> {
        let mut registry = JobRegistry::new();
        registry
            .register("double", |n: i64| async move { Ok(n * 2) })
            .register("boom", |_: ()| async move {
                Err::<(), _>(anyhow::anyhow!("exploded"))
            });
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_run_until_idle_drains_queue() {
        let broker = Arc::new(InMemoryBroker::new());
        let worker = Worker::new(broker.clone(), registry());
        let ok = JobRequest::new("double", json!(21));
        let bad = JobRequest::new("boom", json!(null));
        broker.submit(&ok).await.unwrap();
        broker.submit(&bad).await.unwrap();

        assert_eq!(worker.run_until_idle().await.unwrap(), 2);
        assert_eq!(broker.pending(), 0);

        let ok = broker.status(&ok.id).await.unwrap().unwrap();
        assert_eq!(ok.status, JobStatus::Finished);
        assert_eq!(ok.result, Some(json!(42)));

        let bad = broker.status(&bad.id).await.unwrap().unwrap();
        assert_eq!(bad.status, JobStatus::Failed);
        assert_eq!(bad.error.as_deref(), Some("exploded"));
    }

    #[tokio::test]
    async fn test_unknown_job_fails_record() {
        let broker = Arc::new(InMemoryBroker::new());
        let worker = Worker::new(broker.clone(), registry());
        let request = JobRequest::new("nope", json!(null));
        broker.submit(&request).await.unwrap();

        assert!(worker.run_once().await.unwrap());
        let record = broker.status(&request.id).await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_background_worker_processes_jobs() {
        let broker = Arc::new(InMemoryBroker::new());
        let worker = Worker::new(broker.clone(), registry());
        let task = tokio::spawn(async move { worker.run(Duration::from_millis(5)).await });

        let request = JobRequest::new("double", json!(5));
        broker.submit(&request).await.unwrap();

        let mut record = None;
        for _ in 0..200 {
            let current = broker.status(&request.id).await.unwrap().unwrap();
            if current.status.is_terminal() {
                record = Some(current);
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        task.abort();

        assert_eq!(record.unwrap().result, Some(json!(10)));
    }
}
