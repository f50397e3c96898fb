//! Error types for the deckflow pipeline engine.
//!
//! Only [`InputValidationError`] is meant to reach the top-level caller of a
//! pipeline run. Every other failure category is absorbed by the layer that
//! owns it (retry, cache, stage, dispatcher) and shows up as emptiness in the
//! resulting state or as a failed job handle.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::state::StateField;

/// The main error type for deckflow operations.
#[derive(Debug, Error)]
pub enum DeckflowError {
    /// The pipeline input was rejected before any stage ran.
    #[error("{0}")]
    Validation(#[from] InputValidationError),

    /// A stage returned an update naming a field it does not own.
    #[error("Stage '{stage}' wrote undeclared field '{field}'")]
    StageContract {
        /// The offending stage.
        stage: String,
        /// The field it was not allowed to write.
        field: StateField,
    },

    /// The runner was built without stages.
    #[error("Pipeline has no stages")]
    EmptyPipeline,

    /// Two stages share a name.
    #[error("Duplicate stage name: {0}")]
    DuplicateStage(String),

    /// Configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A dispatcher error that the caller must handle (unknown job, bad args).
    #[error("{0}")]
    Dispatch(#[from] DispatchError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeckflowError {
    /// Returns true if this is an input validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Error raised when a pipeline request fails input validation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct InputValidationError {
    /// Stable error code (e.g. `INPUT-001-TOPIC`).
    pub code: String,
    /// The field that failed validation.
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl InputValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Topic missing or shorter than the minimum length.
    #[must_use]
    pub fn topic_too_short(min_len: usize) -> Self {
        Self::new(
            "INPUT-001-TOPIC",
            "topic",
            format!("Topic must be at least {min_len} characters long."),
        )
    }

    /// Slide count is zero or negative.
    #[must_use]
    pub fn slide_count_not_positive(value: i64) -> Self {
        Self::new(
            "INPUT-002-SLIDE_COUNT",
            "slide_count",
            format!("Slide count must be at least 1 (got {value})."),
        )
    }

    /// A field required by the first stage is empty in the initial state.
    #[must_use]
    pub fn missing_field(stage: &str, field: StateField) -> Self {
        Self::new(
            "INPUT-003-MISSING_FIELD",
            field.as_str(),
            format!("Stage '{stage}' requires '{field}' but the initial state leaves it empty."),
        )
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code));
        map.insert("field".to_string(), serde_json::json!(self.field));
        map.insert("message".to_string(), serde_json::json!(self.message));
        map
    }
}

/// Errors raised while building [`crate::config::Settings`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment value could not be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue {
        /// The environment key.
        key: String,
        /// The raw value.
        value: String,
    },
}

/// Errors from the content-addressed cache layer.
///
/// These never escape [`crate::cache::ResultCache`]; they are logged and the
/// cache degrades to a miss or skips persisting.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the backing store failed.
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An entry exists but could not be decoded.
    #[error("Corrupt cache entry '{key}': {reason}")]
    Corrupt {
        /// The cache key.
        key: String,
        /// Why decoding failed.
        reason: String,
    },

    /// A value or argument could not be serialized.
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the job dispatcher and brokers.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// No job function is registered under this name.
    #[error("Unknown job: {0}")]
    UnknownJob(String),

    /// The broker could not be reached.
    #[error("Broker unavailable: {0}")]
    BrokerUnavailable(String),

    /// The broker rejected or failed an operation.
    #[error("Broker error: {0}")]
    Broker(String),

    /// Job arguments or results could not be (de)serialized.
    #[error("Job serialization error: {0}")]
    Serialization(String),

    /// A job did not finish within the caller's wait budget.
    #[error("Job {id} still pending after {waited_ms}ms")]
    WaitTimeout {
        /// The job id.
        id: String,
        /// How long the caller waited.
        waited_ms: u64,
    },
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for DispatchError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
            Self::BrokerUnavailable(err.to_string())
        } else {
            Self::Broker(err.to_string())
        }
    }
}

/// Whether a service failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorKind {
    /// Network hiccup, timeout, rate limit.
    Transient,
    /// Malformed request, auth failure, unparseable response.
    Permanent,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Permanent => write!(f, "permanent"),
        }
    }
}

/// Error returned by the external services behind the stage ports.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{service} failed ({kind}): {message}")]
pub struct ServiceError {
    /// Transient or permanent.
    pub kind: ServiceErrorKind,
    /// The service that failed (e.g. "planner", "web_search").
    pub service: String,
    /// Failure detail.
    pub message: String,
}

impl ServiceError {
    /// Creates a transient failure.
    #[must_use]
    pub fn transient(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Transient,
            service: service.into(),
            message: message.into(),
        }
    }

    /// Creates a permanent failure.
    #[must_use]
    pub fn permanent(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Permanent,
            service: service.into(),
            message: message.into(),
        }
    }

    /// Returns true if the failure should be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind == ServiceErrorKind::Transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_validation_error() {
        let err = InputValidationError::topic_too_short(3);

        assert_eq!(err.code, "INPUT-001-TOPIC");
        assert_eq!(err.field, "topic");
        assert!(err.to_string().contains("at least 3 characters"));
    }

    #[test]
    fn test_validation_error_to_dict() {
        let err = InputValidationError::slide_count_not_positive(0);
        let dict = err.to_dict();

        assert_eq!(dict.get("code").unwrap(), "INPUT-002-SLIDE_COUNT");
        assert_eq!(dict.get("field").unwrap(), "slide_count");
    }

    #[test]
    fn test_missing_field_error_names_stage() {
        let err = InputValidationError::missing_field("outline", StateField::Topic);
        assert!(err.message.contains("'outline'"));
        assert!(err.message.contains("'topic'"));
    }

    #[test]
    fn test_deckflow_error_is_validation() {
        let err: DeckflowError = InputValidationError::topic_too_short(3).into();
        assert!(err.is_validation());
        assert!(!DeckflowError::EmptyPipeline.is_validation());
    }

    #[test]
    fn test_stage_contract_message() {
        let err = DeckflowError::StageContract {
            stage: "media".to_string(),
            field: StateField::OutputPath,
        };
        assert_eq!(err.to_string(), "Stage 'media' wrote undeclared field 'output_path'");
    }

    #[test]
    fn test_service_error_classification() {
        assert!(ServiceError::transient("planner", "timeout").is_retryable());
        assert!(!ServiceError::permanent("planner", "401").is_retryable());
        assert_eq!(
            ServiceError::transient("web_search", "reset").to_string(),
            "web_search failed (transient): reset"
        );
    }
}
