//! Job requests and records exchanged with a broker.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::{generate_uuid, Timestamp};

/// Lifecycle of a dispatched job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting in the queue.
    Queued,
    /// Picked up by a worker.
    Started,
    /// Completed with a result.
    Finished,
    /// Completed with an error.
    Failed,
}

impl JobStatus {
    /// Returns true for `Finished` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Started => "started",
            Self::Finished => "finished",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A unit of work placed on the queue: a registered job name plus JSON args.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Unique job id.
    pub id: String,
    /// Registered job name.
    pub name: String,
    /// Serialized arguments.
    pub args: Value,
    /// When the job was enqueued.
    pub enqueued_at: Timestamp,
}

impl JobRequest {
    /// Creates a request with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            id: generate_uuid().to_string(),
            name: name.into(),
            args,
            enqueued_at: Utc::now(),
        }
    }
}

/// Observable state of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job id.
    pub id: String,
    /// Registered job name.
    pub name: String,
    /// Current status.
    pub status: JobStatus,
    /// Return value once finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error description once failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the job was enqueued.
    pub enqueued_at: Timestamp,
    /// When the job reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<Timestamp>,
}

impl JobRecord {
    /// Record for a freshly enqueued request.
    #[must_use]
    pub fn queued(request: &JobRequest) -> Self {
        Self {
            id: request.id.clone(),
            name: request.name.clone(),
            status: JobStatus::Queued,
            result: None,
            error: None,
            enqueued_at: request.enqueued_at,
            ended_at: None,
        }
    }

    /// Marks the record as picked up.
    #[must_use]
    pub fn started(mut self) -> Self {
        self.status = JobStatus::Started;
        self
    }

    /// Marks the record as finished with `result`.
    #[must_use]
    pub fn finished(mut self, result: Value) -> Self {
        self.status = JobStatus::Finished;
        self.result = Some(result);
        self.error = None;
        self.ended_at = Some(Utc::now());
        self
    }

    /// Marks the record as failed with `error`.
    #[must_use]
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.status = JobStatus::Failed;
        self.result = None;
        self.error = Some(error.into());
        self.ended_at = Some(Utc::now());
        self
    }

    /// Applies an execution outcome.
    #[must_use]
    pub fn complete(self, outcome: anyhow::Result<Value>) -> Self {
        match outcome {
            Ok(value) => self.finished(value),
            Err(e) => self.failed(format!("{e:#}")),
        }
    }
}
