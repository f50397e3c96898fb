use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::cache::ResultCache;
use crate::errors::ServiceError;
use crate::interceptors::{cached, operation, retrying, Operation, SharedOperation};
use crate::pipeline::RetryPolicy;
use crate::stages::{recover, ContentWriter, Stage, WriteRequest};
use crate::state::{PipelineState, Slide, StateField, StateUpdate};

/// Writes slide bodies from the outline and research notes.
pub struct ContentStage {
    write: SharedOperation<WriteRequest, Vec<Slide>, ServiceError>,
}

impl ContentStage {
    /// Stage name.
    pub const NAME: &'static str = "content";

    /// Creates the stage with retried, cached writer calls.
    pub fn new(writer: Arc<dyn ContentWriter>, policy: RetryPolicy, cache: Arc<ResultCache>) -> Self {
        let call = operation("write_content", move |request: WriteRequest| {
            let writer = writer.clone();
            async move { writer.write(&request).await }
        });
        let op = cached(retrying(call, policy).retry_if(ServiceError::is_retryable), cache)
            .skip_when(Vec::is_empty);
        Self { write: Arc::new(op) }
    }
}

impl fmt::Debug for ContentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentStage")
            .field("op", &self.write.name())
            .finish()
    }
}

#[async_trait]
impl Stage for ContentStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn writes(&self) -> &[StateField] {
        &[StateField::Slides]
    }

    async fn run(&self, state: &PipelineState) -> StateUpdate {
        if state.outline.is_empty() {
            tracing::warn!(stage = Self::NAME, "No outline, skipping writing");
            return StateUpdate::slides(Vec::new());
        }

        let request = WriteRequest {
            topic: state.topic.trim().to_string(),
            depth: state.depth,
            outline: state.outline.clone(),
            research_notes: state.research_notes.clone(),
        };
        let slides: Vec<Slide> = recover(Self::NAME, "Content writing", self.write.call(&request).await)
            .into_iter()
            .map(|slide| Slide::new(slide.title, slide.content))
            .collect();

        tracing::info!(stage = Self::NAME, slides = slides.len(), "Slides written");
        StateUpdate::slides(slides)
    }
}
