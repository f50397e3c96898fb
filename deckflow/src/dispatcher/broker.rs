//! Broker abstraction and the in-process implementation.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use super::job::{JobRecord, JobRequest};
use crate::errors::DispatchError;

/// A queue of job requests plus a store of job records.
#[async_trait]
pub trait JobBroker: Send + Sync {
    /// Human-readable backend name for logs.
    fn backend(&self) -> &'static str;

    /// Checks that the broker is reachable.
    async fn ping(&self) -> Result<(), DispatchError>;

    /// Stores a queued record for `request` and appends it to the queue.
    async fn submit(&self, request: &JobRequest) -> Result<(), DispatchError>;

    /// Returns the current record of a job, if known.
    async fn status(&self, id: &str) -> Result<Option<JobRecord>, DispatchError>;

    /// Pops the oldest queued request and marks it started.
    async fn take_next(&self) -> Result<Option<JobRequest>, DispatchError>;

    /// Stores the terminal record of a job.
    async fn complete(&self, record: &JobRecord) -> Result<(), DispatchError>;
}

/// Process-local FIFO broker.
///
/// Used for tests and single-process deployments where a [`super::Worker`]
/// drains the queue on a background task.
#[derive(Debug)]
pub struct InMemoryBroker {
    queue: Mutex<VecDeque<JobRequest>>,
    records: Mutex<HashMap<String, JobRecord>>,
    reachable: AtomicBool,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    /// Creates an empty, reachable broker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            records: Mutex::new(HashMap::new()),
            reachable: AtomicBool::new(true),
        }
    }

    /// Creates a broker whose every operation fails as unreachable.
    #[must_use]
    pub fn unreachable() -> Self {
        let broker = Self::new();
        broker.set_reachable(false);
        broker
    }

    /// Toggles simulated reachability.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Number of requests waiting in the queue.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    fn check(&self) -> Result<(), DispatchError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DispatchError::BrokerUnavailable(
                "in-memory broker marked unreachable".to_string(),
            ))
        }
    }
}

#[async_trait]
impl JobBroker for InMemoryBroker {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), DispatchError> {
        self.check()
    }

    async fn submit(&self, request: &JobRequest) -> Result<(), DispatchError> {
        self.check()?;
        self.records
            .lock()
            .insert(request.id.clone(), JobRecord::queued(request));
        self.queue.lock().push_back(request.clone());
        Ok(())
    }

    async fn status(&self, id: &str) -> Result<Option<JobRecord>, DispatchError> {
        self.check()?;
        Ok(self.records.lock().get(id).cloned())
    }

    async fn take_next(&self) -> Result<Option<JobRequest>, DispatchError> {
        self.check()?;
        let Some(request) = self.queue.lock().pop_front() else {
            return Ok(None);
        };
        let mut records = self.records.lock();
        let record = records
            .remove(&request.id)
            .unwrap_or_else(|| JobRecord::queued(&request));
        records.insert(request.id.clone(), record.started());
        Ok(Some(request))
    }

    async fn complete(&self, record: &JobRecord) -> Result<(), DispatchError> {
        self.check()?;
        self.records.lock().insert(record.id.clone(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::JobStatus;
    use serde_json::json;

    #[tokio::test]
    async fn test_fifo_order_and_status_transitions() {
        let broker = InMemoryBroker::new();
        let first = JobRequest::new("a", json!(1));
        let second = JobRequest::new("b", json!(2));
        broker.submit(&first).await.unwrap();
        broker.submit(&second).await.unwrap();
        assert_eq!(broker.pending(), 2);

        let taken = broker.take_next().await.unwrap().unwrap();
        assert_eq!(taken.id, first.id);

        let status = broker.status(&first.id).await.unwrap().unwrap();
        assert_eq!(status.status, JobStatus::Started);
        let status = broker.status(&second.id).await.unwrap().unwrap();
        assert_eq!(status.status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn test_unreachable_broker_rejects_everything() {
        let broker = InMemoryBroker::unreachable();
        assert!(matches!(
            broker.ping().await,
            Err(DispatchError::BrokerUnavailable(_))
        ));
        assert!(broker.submit(&JobRequest::new("a", json!(null))).await.is_err());

        broker.set_reachable(true);
        assert!(broker.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_queue_yields_none() {
        let broker = InMemoryBroker::new();
        assert!(broker.take_next().await.unwrap().is_none());
        assert!(broker.status("missing").await.unwrap().is_none());
    }
}
