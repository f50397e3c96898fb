//! Redis-backed broker.
//!
//! # Key layout
//!
//! - `{queue}`: list of serialized [`JobRequest`]s, LPUSH on submit, RPOP on take
//! - `{queue}:job:{id}`: serialized [`JobRecord`] for status polling

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

use super::broker::JobBroker;
use super::job::{JobRecord, JobRequest};
use crate::errors::DispatchError;

/// Broker over a Redis list plus per-job record keys.
#[derive(Clone)]
pub struct RedisBroker {
    redis: ConnectionManager,
    queue: String,
}

impl std::fmt::Debug for RedisBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBroker")
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl RedisBroker {
    /// Connects to `url`, giving up after `timeout`.
    pub async fn connect(url: &str, queue: &str, timeout: Duration) -> Result<Self, DispatchError> {
        let client = redis::Client::open(url)
            .map_err(|e| DispatchError::BrokerUnavailable(e.to_string()))?;

        let redis = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                DispatchError::BrokerUnavailable(format!(
                    "connection timed out after {}ms",
                    timeout.as_millis()
                ))
            })?
            .map_err(|e| DispatchError::BrokerUnavailable(e.to_string()))?;

        Ok(Self::from_connection(redis, queue))
    }

    /// Wraps an existing connection.
    #[must_use]
    pub fn from_connection(redis: ConnectionManager, queue: &str) -> Self {
        Self {
            redis,
            queue: queue.to_string(),
        }
    }

    fn record_key(&self, id: &str) -> String {
        format!("{}:job:{id}", self.queue)
    }

    async fn store_record(&self, record: &JobRecord) -> Result<(), DispatchError> {
        let serialized = serde_json::to_string(record)?;
        let mut conn = self.redis.clone();
        conn.set::<_, _, ()>(self.record_key(&record.id), serialized)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl JobBroker for RedisBroker {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn ping(&self) -> Result<(), DispatchError> {
        let mut conn = self.redis.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }

    async fn submit(&self, request: &JobRequest) -> Result<(), DispatchError> {
        self.store_record(&JobRecord::queued(request)).await?;
        let serialized = serde_json::to_string(request)?;
        let mut conn = self.redis.clone();
        conn.lpush::<_, _, ()>(&self.queue, serialized).await?;
        Ok(())
    }

    async fn status(&self, id: &str) -> Result<Option<JobRecord>, DispatchError> {
        let mut conn = self.redis.clone();
        let raw: Option<String> = conn.get(self.record_key(id)).await?;
        raw.map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(DispatchError::from)
    }

    async fn take_next(&self) -> Result<Option<JobRequest>, DispatchError> {
        let mut conn = self.redis.clone();
        let raw: Option<String> = redis::cmd("RPOP")
            .arg(&self.queue)
            .query_async(&mut conn)
            .await?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let request: JobRequest = serde_json::from_str(&raw)?;

        let record = match self.status(&request.id).await? {
            Some(record) => record.started(),
            None => JobRecord::queued(&request).started(),
        };
        self.store_record(&record).await?;
        Ok(Some(request))
    }

    async fn complete(&self, record: &JobRecord) -> Result<(), DispatchError> {
        self.store_record(record).await
    }
}
