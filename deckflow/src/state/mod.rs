//! Typed pipeline state threaded through the stages.
//!
//! This module contains:
//! - The `PipelineState` record and its value types
//! - `StateUpdate`, the partial update a stage returns
//! - `StateField`, the field names used for ownership checks

mod types;
mod update;

pub use types::{Depth, OutlineItem, PipelineState, ResearchNotes, Slide, StateField};
pub use update::StateUpdate;
