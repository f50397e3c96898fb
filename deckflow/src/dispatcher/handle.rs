//! Caller-side view of a dispatched job.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::broker::JobBroker;
use super::job::{JobRecord, JobStatus};
use crate::errors::DispatchError;

/// Handle returned by [`super::JobDispatcher::enqueue`].
///
/// Both dispatch modes return the same type. A handle from inline execution
/// is already terminal and [`JobHandle::refresh`] is a no-op; a queued handle
/// polls its broker.
#[derive(Clone)]
pub struct JobHandle {
    record: JobRecord,
    broker: Option<Arc<dyn JobBroker>>,
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("record", &self.record)
            .field("remote", &self.broker.is_some())
            .finish()
    }
}

impl JobHandle {
    /// A handle that tracks a queued job through `broker`.
    #[must_use]
    pub fn remote(record: JobRecord, broker: Arc<dyn JobBroker>) -> Self {
        Self {
            record,
            broker: Some(broker),
        }
    }

    /// A handle over an already-known record.
    #[must_use]
    pub fn resolved(record: JobRecord) -> Self {
        Self {
            record,
            broker: None,
        }
    }

    /// The job id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// The last observed record.
    #[must_use]
    pub fn record(&self) -> &JobRecord {
        &self.record
    }

    /// The last observed status.
    #[must_use]
    pub fn status(&self) -> JobStatus {
        self.record.status
    }

    /// True once the job completed successfully.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.record.status == JobStatus::Finished
    }

    /// True once the job completed with an error.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.record.status == JobStatus::Failed
    }

    /// The raw JSON result, once finished.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.record.result.as_ref()
    }

    /// The result decoded as `T`, once finished.
    pub fn result_as<T: DeserializeOwned>(&self) -> Result<Option<T>, DispatchError> {
        self.record
            .result
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(DispatchError::from)
    }

    /// The failure description, once failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.record.error.as_deref()
    }

    /// Re-reads the record from the broker.
    pub async fn refresh(&mut self) -> Result<JobStatus, DispatchError> {
        let Some(broker) = &self.broker else {
            return Ok(self.record.status);
        };
        if self.record.status.is_terminal() {
            return Ok(self.record.status);
        }
        match broker.status(&self.record.id).await? {
            Some(record) => self.record = record,
            None => tracing::warn!(job_id = %self.record.id, "Job record missing from broker"),
        }
        Ok(self.record.status)
    }

    /// Polls until the job is terminal or `max_wait` elapses.
    pub async fn wait(
        &mut self,
        poll_interval: Duration,
        max_wait: Option<Duration>,
    ) -> Result<JobStatus, DispatchError> {
        let started = Instant::now();
        loop {
            let status = self.refresh().await?;
            if status.is_terminal() {
                return Ok(status);
            }
            if let Some(limit) = max_wait {
                let waited = started.elapsed();
                if waited >= limit {
                    return Err(DispatchError::WaitTimeout {
                        id: self.record.id.clone(),
                        waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                    });
                }
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}
