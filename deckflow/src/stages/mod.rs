//! Stage trait and implementations.
//!
//! A stage reads the accumulated [`PipelineState`] and returns a
//! [`StateUpdate`] naming only the fields it owns. `run` has no error
//! channel: a stage handles its own failures and degrades to the empty value
//! of its fields. A panic inside a stage is a bug and aborts the run.

mod fallback;
pub mod ports;
pub mod presentation;

pub use fallback::{recover, recover_with};
pub use ports::{
    ContentWriter, DocumentRenderer, ImageSource, OutlinePlanner, PresentationPorts, RenderRequest,
    ResearchSource, WriteRequest,
};
pub use presentation::{
    presentation_stages, ContentStage, DocumentStage, MediaStage, OutlineStage, ResearchStage,
};

use async_trait::async_trait;
use std::fmt::Debug;

use crate::state::{PipelineState, StateField, StateUpdate};

/// A single pipeline step.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the stage name.
    fn name(&self) -> &str;

    /// Fields that must be non-empty when this stage runs first.
    fn requires(&self) -> &[StateField] {
        &[]
    }

    /// Fields this stage's update may name.
    fn writes(&self) -> &[StateField] {
        &StateField::DERIVED
    }

    /// Produces this stage's partial update.
    async fn run(&self, state: &PipelineState) -> StateUpdate;
}

/// A stage backed by a synchronous closure.
pub struct FnStage<F>
where
    F: Fn(&PipelineState) -> StateUpdate + Send + Sync,
{
    name: String,
    func: F,
    requires: Vec<StateField>,
    writes: Vec<StateField>,
}

impl<F> FnStage<F>
where
    F: Fn(&PipelineState) -> StateUpdate + Send + Sync,
{
    /// Creates a stage that may write every derived field.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
            requires: Vec::new(),
            writes: StateField::DERIVED.to_vec(),
        }
    }

    /// Declares required input fields.
    #[must_use]
    pub fn with_requires(mut self, fields: &[StateField]) -> Self {
        self.requires = fields.to_vec();
        self
    }

    /// Declares the fields this stage writes.
    #[must_use]
    pub fn with_writes(mut self, fields: &[StateField]) -> Self {
        self.writes = fields.to_vec();
        self
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(&PipelineState) -> StateUpdate + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage")
            .field("name", &self.name)
            .field("writes", &self.writes)
            .finish()
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(&PipelineState) -> StateUpdate + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn requires(&self) -> &[StateField] {
        &self.requires
    }

    fn writes(&self) -> &[StateField] {
        &self.writes
    }

    async fn run(&self, state: &PipelineState) -> StateUpdate {
        (self.func)(state)
    }
}

/// A stage that changes nothing.
#[derive(Debug, Clone)]
pub struct NoOpStage {
    name: String,
}

impl NoOpStage {
    /// Creates a new no-op stage.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Stage for NoOpStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn writes(&self) -> &[StateField] {
        &[]
    }

    async fn run(&self, _state: &PipelineState) -> StateUpdate {
        StateUpdate::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Depth, OutlineItem};

    fn state() -> PipelineState {
        PipelineState::new("Rust", 2, "Arial", Depth::Concise)
    }

    #[tokio::test]
    async fn test_fn_stage() {
        let stage = FnStage::new("outline", |s: &PipelineState| {
            StateUpdate::outline(vec![OutlineItem::new(s.topic.clone(), "")])
        })
        .with_requires(&[StateField::Topic])
        .with_writes(&[StateField::Outline]);

        assert_eq!(stage.name(), "outline");
        assert_eq!(stage.requires(), &[StateField::Topic]);
        assert_eq!(stage.writes(), &[StateField::Outline]);

        let update = stage.run(&state()).await;
        assert_eq!(update.outline.unwrap()[0].title, "Rust");
    }

    #[tokio::test]
    async fn test_noop_stage() {
        let stage = NoOpStage::new("noop");

        assert!(stage.requires().is_empty());
        assert!(stage.writes().is_empty());
        assert!(stage.run(&state()).await.is_empty());
    }
}
