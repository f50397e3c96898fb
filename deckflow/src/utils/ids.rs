//! Identifier and timestamp helpers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// UTC timestamp type used in cache entries and job records.
pub type Timestamp = DateTime<Utc>;

/// Generates a new random UUID.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Generates a time-ordered identifier for a pipeline run.
#[must_use]
pub fn generate_run_id() -> String {
    Uuid::now_v7().to_string()
}

/// Returns the current UTC time as `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`.
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}
