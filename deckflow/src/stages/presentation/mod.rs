//! The five stages that turn a topic into a rendered deck.
//!
//! Order is fixed: outline, research, content, media, document. Each stage
//! owns exactly the field it writes, except media which rewrites the slides
//! produced by content.

mod content;
mod document;
mod media;
mod outline;
mod research;

pub use content::ContentStage;
pub use document::DocumentStage;
pub use media::{placeholder_image_url, KeywordArgs, MediaStage};
pub use outline::{OutlineArgs, OutlineStage};
pub use research::{format_snippets, research_query, ResearchStage, SearchArgs, MAX_SNIPPETS};

use std::sync::Arc;

use super::{PresentationPorts, Stage};
use crate::cache::ResultCache;
use crate::config::Settings;

/// Builds the presentation stages in execution order.
#[must_use]
pub fn presentation_stages(
    ports: &PresentationPorts,
    settings: &Settings,
    cache: &Arc<ResultCache>,
) -> Vec<Arc<dyn Stage>> {
    vec![
        Arc::new(OutlineStage::new(ports.planner.clone(), settings.retry.clone(), cache.clone())),
        Arc::new(ResearchStage::new(ports.research.clone(), settings.retry.clone(), cache.clone())),
        Arc::new(ContentStage::new(ports.writer.clone(), settings.retry.clone(), cache.clone())),
        Arc::new(MediaStage::new(ports.images.clone(), cache.clone())),
        Arc::new(DocumentStage::new(
            ports.renderer.clone(),
            settings.retry.clone(),
            settings.output_dir.clone(),
        )),
    ]
}
