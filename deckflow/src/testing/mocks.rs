//! Mock stages for testing.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::stages::Stage;
use crate::state::{PipelineState, StateField, StateUpdate};

/// A stage that counts calls and returns a configurable update.
#[derive(Debug)]
pub struct MockStage {
    name: String,
    update: Mutex<StateUpdate>,
    requires: Vec<StateField>,
    writes: Vec<StateField>,
    call_count: Mutex<usize>,
}

impl MockStage {
    /// Creates a mock that returns an empty update.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            update: Mutex::new(StateUpdate::none()),
            requires: Vec::new(),
            writes: StateField::DERIVED.to_vec(),
            call_count: Mutex::new(0),
        }
    }

    /// Creates a mock returning `update` and owning exactly its fields.
    #[must_use]
    pub fn returning(name: impl Into<String>, update: StateUpdate) -> Self {
        let writes = update.fields();
        Self {
            writes,
            update: Mutex::new(update),
            ..Self::new(name)
        }
    }

    /// Declares required input fields.
    #[must_use]
    pub fn with_requires(mut self, fields: &[StateField]) -> Self {
        self.requires = fields.to_vec();
        self
    }

    /// Replaces the update to return.
    pub fn set_update(&self, update: StateUpdate) {
        *self.update.lock() = update;
    }

    /// Returns the number of times the stage ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

#[async_trait]
impl Stage for MockStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires(&self) -> &[StateField] {
        &self.requires
    }

    fn writes(&self) -> &[StateField] {
        &self.writes
    }

    async fn run(&self, _state: &PipelineState) -> StateUpdate {
        *self.call_count.lock() += 1;
        self.update.lock().clone()
    }
}

/// A stage that records every state it is given and changes nothing.
#[derive(Debug)]
pub struct RecordingStage {
    name: String,
    seen: Mutex<Vec<PipelineState>>,
}

impl RecordingStage {
    /// Creates a new recording stage.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Returns the states observed, in call order.
    #[must_use]
    pub fn observed(&self) -> Vec<PipelineState> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Stage for RecordingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn writes(&self) -> &[StateField] {
        &[]
    }

    async fn run(&self, state: &PipelineState) -> StateUpdate {
        self.seen.lock().push(state.clone());
        StateUpdate::none()
    }
}
