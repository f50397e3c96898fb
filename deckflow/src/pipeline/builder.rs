//! Pipeline builder with validation.

use std::collections::HashSet;
use std::sync::Arc;

use super::PipelineRunner;
use crate::cache::ResultCache;
use crate::config::Settings;
use crate::errors::DeckflowError;
use crate::events::{EventSink, NoOpEventSink};
use crate::stages::{presentation_stages, PresentationPorts, Stage};
use crate::state::StateField;

/// Builder for [`PipelineRunner`].
pub struct PipelineBuilder {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
    sink: Option<Arc<dyn EventSink>>,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.name)
            .field("stages", &self.stages.len())
            .finish_non_exhaustive()
    }
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            sink: None,
        }
    }

    /// Appends a stage. Stages run in the order they are added.
    #[must_use]
    pub fn stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Appends several stages.
    #[must_use]
    pub fn stages(mut self, stages: impl IntoIterator<Item = Arc<dyn Stage>>) -> Self {
        self.stages.extend(stages);
        self
    }

    /// Sets the event sink. Defaults to [`NoOpEventSink`].
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Returns the number of stages added so far.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Validates and builds the runner.
    ///
    /// # Errors
    ///
    /// Fails on an empty pipeline, duplicate stage names, or a stage declaring
    /// that it writes an input field.
    pub fn build(self) -> Result<PipelineRunner, DeckflowError> {
        if self.stages.is_empty() {
            return Err(DeckflowError::EmptyPipeline);
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            if !seen.insert(stage.name().to_string()) {
                return Err(DeckflowError::DuplicateStage(stage.name().to_string()));
            }
            if let Some(field) = stage
                .writes()
                .iter()
                .find(|f| !StateField::DERIVED.contains(*f))
            {
                return Err(DeckflowError::StageContract {
                    stage: stage.name().to_string(),
                    field: *field,
                });
            }
        }

        let sink = self.sink.unwrap_or_else(|| Arc::new(NoOpEventSink));
        Ok(PipelineRunner::new(self.name, self.stages, sink))
    }
}

impl PipelineRunner {
    /// Builds the outline, research, content, media and document pipeline.
    pub fn presentation(
        ports: &PresentationPorts,
        settings: &Settings,
        cache: &Arc<ResultCache>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, DeckflowError> {
        PipelineBuilder::new("presentation")
            .stages(presentation_stages(ports, settings, cache))
            .with_event_sink(sink)
            .build()
    }
}
