use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::ServiceError;
use crate::interceptors::{operation, retrying, Operation, SharedOperation};
use crate::pipeline::RetryPolicy;
use crate::stages::{recover, DocumentRenderer, RenderRequest, Stage};
use crate::state::{PipelineState, StateField, StateUpdate};
use crate::utils::presentation_file_name;

/// Renders the slides to a document on disk.
///
/// Rendering writes a file, so it is retried but never cached.
pub struct DocumentStage {
    render: SharedOperation<RenderRequest, String, ServiceError>,
    output_dir: PathBuf,
}

impl DocumentStage {
    /// Stage name.
    pub const NAME: &'static str = "document";

    /// Creates the stage writing into `output_dir`.
    pub fn new(renderer: Arc<dyn DocumentRenderer>, policy: RetryPolicy, output_dir: impl Into<PathBuf>) -> Self {
        let call = operation("render_document", move |request: RenderRequest| {
            let renderer = renderer.clone();
            async move { renderer.render(&request).await }
        });
        Self {
            render: Arc::new(retrying(call, policy).retry_if(ServiceError::is_retryable)),
            output_dir: output_dir.into(),
        }
    }

    /// Path the document for `topic` is written to.
    #[must_use]
    pub fn output_path_for(&self, topic: &str) -> PathBuf {
        self.output_dir.join(presentation_file_name(topic))
    }
}

impl fmt::Debug for DocumentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStage")
            .field("op", &self.render.name())
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

#[async_trait]
impl Stage for DocumentStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn writes(&self) -> &[StateField] {
        &[StateField::OutputPath]
    }

    async fn run(&self, state: &PipelineState) -> StateUpdate {
        if state.slides.is_empty() {
            tracing::warn!(stage = Self::NAME, "No slides, skipping rendering");
            return StateUpdate::output_path("");
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.output_dir).await {
            tracing::error!(
                stage = Self::NAME,
                dir = %self.output_dir.display(),
                error = %e,
                "Could not create output directory"
            );
            return StateUpdate::output_path("");
        }

        let request = RenderRequest {
            topic: state.topic.trim().to_string(),
            font: state.font.clone(),
            slides: state.slides.clone(),
            output_path: self.output_path_for(&state.topic),
        };
        let path = recover(Self::NAME, "Rendering", self.render.call(&request).await);
        if !path.is_empty() {
            tracing::info!(stage = Self::NAME, path = %path, "Document rendered");
        }
        StateUpdate::output_path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::ports::MockDocumentRenderer;
    use crate::state::{Depth, Slide};
    use std::time::Duration;
    use tempfile::TempDir;

    fn state() -> PipelineState {
        let mut state = PipelineState::new("Climate Change", 1, "Arial", Depth::Concise);
        state.slides = vec![Slide::new("Intro", "- warming")];
        state
    }

    #[tokio::test]
    async fn test_renders_into_output_dir() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("decks");
        let expected = out.join("Climate_Change_presentation.pptx");
        let expected_req = expected.clone();

        let mut renderer = MockDocumentRenderer::new();
        renderer
            .expect_render()
            .withf(move |req| req.output_path == expected_req && req.font == "Arial")
            .times(1)
            .returning(|req| Ok(req.output_path.display().to_string()));

        let stage = DocumentStage::new(Arc::new(renderer), RetryPolicy::no_retry(), &out);
        let update = stage.run(&state()).await;

        assert!(out.is_dir());
        assert_eq!(update.output_path, Some(expected.display().to_string()));
    }

    #[tokio::test]
    async fn test_render_failure_is_retried_then_degrades() {
        let dir = TempDir::new().unwrap();
        let mut renderer = MockDocumentRenderer::new();
        renderer
            .expect_render()
            .times(2)
            .returning(|_| Err(ServiceError::transient("renderer", "disk busy")));

        let policy = RetryPolicy::new()
            .with_max_attempts(2)
            .with_initial_delay(Duration::from_millis(1));
        let stage = DocumentStage::new(Arc::new(renderer), policy, dir.path());

        assert_eq!(stage.run(&state()).await.output_path, Some(String::new()));
    }

    #[tokio::test]
    async fn test_no_slides_means_no_document() {
        let mut renderer = MockDocumentRenderer::new();
        renderer.expect_render().never();

        let stage = DocumentStage::new(Arc::new(renderer), RetryPolicy::no_retry(), "unused");
        let update = stage
            .run(&PipelineState::new("Rust", 1, "Arial", Depth::Concise))
            .await;
        assert_eq!(update.output_path, Some(String::new()));
    }
}
