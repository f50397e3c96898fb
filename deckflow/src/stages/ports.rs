//! Service ports the presentation stages call.
//!
//! Each port is one external capability. Implementations return
//! [`ServiceError`] with a transient/permanent classification that the
//! retry wrapper uses to decide whether to try again.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::ServiceError;
use crate::state::{Depth, OutlineItem, ResearchNotes, Slide};

/// Plans the slide outline for a topic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OutlinePlanner: Send + Sync {
    /// Returns up to `slide_count` outline items pitched at `depth`.
    async fn plan(&self, topic: &str, slide_count: u32, depth: Depth) -> Result<Vec<OutlineItem>, ServiceError>;
}

/// Looks up background facts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResearchSource: Send + Sync {
    /// Returns text snippets for `query`, at most `max_results`.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, ServiceError>;
}

/// Input to [`ContentWriter::write`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRequest {
    /// Presentation topic.
    pub topic: String,
    /// Content depth.
    pub depth: Depth,
    /// The planned outline.
    pub outline: Vec<OutlineItem>,
    /// Research notes keyed by slide title.
    pub research_notes: ResearchNotes,
}

/// Writes slide bodies from the outline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentWriter: Send + Sync {
    /// Returns one slide per outline item.
    async fn write(&self, request: &WriteRequest) -> Result<Vec<Slide>, ServiceError>;
}

/// Picks images for slides.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Returns a short search keyword for a slide.
    async fn keyword(&self, title: &str, content: &str) -> Result<String, ServiceError>;

    /// Returns an image URL for a keyword.
    async fn image_url(&self, keyword: &str) -> Result<String, ServiceError>;
}

/// Input to [`DocumentRenderer::render`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Presentation topic, used as the title slide.
    pub topic: String,
    /// Font for all text.
    pub font: String,
    /// Slides to render.
    pub slides: Vec<Slide>,
    /// Where to write the document.
    pub output_path: PathBuf,
}

/// Writes the final document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Renders the document and returns the path written.
    async fn render(&self, request: &RenderRequest) -> Result<String, ServiceError>;
}

/// The full set of ports the presentation pipeline needs.
#[derive(Clone)]
pub struct PresentationPorts {
    /// Outline planner.
    pub planner: Arc<dyn OutlinePlanner>,
    /// Research source.
    pub research: Arc<dyn ResearchSource>,
    /// Content writer.
    pub writer: Arc<dyn ContentWriter>,
    /// Image source.
    pub images: Arc<dyn ImageSource>,
    /// Document renderer.
    pub renderer: Arc<dyn DocumentRenderer>,
}

impl std::fmt::Debug for PresentationPorts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentationPorts").finish_non_exhaustive()
    }
}
