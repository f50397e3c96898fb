//! Testing utilities for deckflow pipelines.
//!
//! This module provides:
//! - Mock and recording stages
//! - Stub and failing service ports
//! - Assertions over pipeline state

mod assertions;
mod mocks;
mod stubs;

pub use assertions::{assert_fields_unchanged, assert_state_complete, assert_structurally_complete};
pub use mocks::{MockStage, RecordingStage};
pub use stubs::{
    failing_ports, stub_ports, FailingService, StubImages, StubPlanner, StubRenderer, StubResearch,
    StubWriter,
};
