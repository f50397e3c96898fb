//! Small helpers shared across modules: identifiers, timestamps and paths.

mod ids;
mod paths;

pub use ids::{generate_run_id, generate_uuid, iso_timestamp, Timestamp};
pub use paths::{presentation_file_name, sanitize_file_stem};
