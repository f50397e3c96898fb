//! Validated entry point for a presentation run.

use serde::{Deserialize, Serialize};

use super::PipelineRunner;
use crate::config::{is_supported_font, DEFAULT_DEPTH, DEFAULT_FONT, DEFAULT_SLIDE_COUNT, MIN_TOPIC_LEN};
use crate::errors::{DeckflowError, InputValidationError};
use crate::state::{Depth, PipelineState};

/// What a caller asks the pipeline to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRequest {
    /// Presentation topic.
    pub topic: String,
    /// Number of slides; defaults to 7.
    #[serde(default)]
    pub slide_count: Option<i64>,
    /// Font name; defaults to Calibri.
    #[serde(default = "default_font")]
    pub font: String,
    /// Content depth; defaults to Concise.
    #[serde(default)]
    pub depth: Depth,
}

fn default_font() -> String {
    DEFAULT_FONT.to_string()
}

impl PipelineRequest {
    /// Creates a request with default slide count, font and depth.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            slide_count: None,
            font: default_font(),
            depth: DEFAULT_DEPTH,
        }
    }

    /// Sets the slide count.
    #[must_use]
    pub fn with_slide_count(mut self, count: i64) -> Self {
        self.slide_count = Some(count);
        self
    }

    /// Sets the font.
    #[must_use]
    pub fn with_font(mut self, font: impl Into<String>) -> Self {
        self.font = font.into();
        self
    }

    /// Sets the depth.
    #[must_use]
    pub fn with_depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self
    }

    /// Validates the request and builds the initial state.
    ///
    /// The topic is trimmed before the length check and in the state.
    pub fn validate(&self) -> Result<PipelineState, InputValidationError> {
        let topic = self.topic.trim();
        if topic.chars().count() < MIN_TOPIC_LEN {
            return Err(InputValidationError::topic_too_short(MIN_TOPIC_LEN));
        }

        let requested = self.slide_count.unwrap_or(i64::from(DEFAULT_SLIDE_COUNT));
        if requested < 1 {
            return Err(InputValidationError::slide_count_not_positive(requested));
        }
        let slide_count = u32::try_from(requested).map_err(|_| {
            InputValidationError::new(
                "INPUT-002-SLIDE_COUNT",
                "slide_count",
                format!("Slide count {requested} is too large."),
            )
        })?;

        let font = if self.font.trim().is_empty() {
            DEFAULT_FONT
        } else {
            self.font.trim()
        };
        if !is_supported_font(font) {
            tracing::warn!(font, "Unsupported font requested, renderer may substitute");
        }

        Ok(PipelineState::new(topic, slide_count, font, self.depth))
    }
}

/// Validates `request` and runs it through `runner`.
///
/// An invalid request is rejected before any stage runs.
pub async fn run_pipeline(
    runner: &PipelineRunner,
    request: &PipelineRequest,
) -> Result<PipelineState, DeckflowError> {
    let initial = request.validate().map_err(|e| {
        tracing::warn!(code = %e.code, error = %e, "Request rejected");
        e
    })?;
    runner.run(initial).await
}
