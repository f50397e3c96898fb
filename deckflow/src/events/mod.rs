//! Lifecycle events emitted by the pipeline runner.
//!
//! Sinks are handed to the runner explicitly; there is no process-wide sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// A run was accepted and is about to execute its first stage.
pub const PIPELINE_STARTED: &str = "pipeline.started";
/// The input failed validation; no stage ran.
pub const PIPELINE_REJECTED: &str = "pipeline.rejected";
/// Every stage ran.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
/// A stage is about to run.
pub const STAGE_STARTED: &str = "stage.started";
/// A stage returned and its update was merged.
pub const STAGE_COMPLETED: &str = "stage.completed";

/// Builds the payload shared by every event of one run.
#[must_use]
pub fn run_payload(run_id: &str, topic: &str) -> serde_json::Value {
    serde_json::json!({
        "run_id": run_id,
        "topic": topic,
        "timestamp": crate::utils::iso_timestamp(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_payload_fields() {
        let payload = run_payload("run-1", "Rust");
        assert_eq!(payload["run_id"], "run-1");
        assert_eq!(payload["topic"], "Rust");
        assert!(payload["timestamp"].is_string());
    }
}
