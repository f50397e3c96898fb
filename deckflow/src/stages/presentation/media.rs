use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::cache::ResultCache;
use crate::errors::ServiceError;
use crate::interceptors::{cached, operation, Operation, SharedOperation};
use crate::stages::{ImageSource, Stage};
use crate::state::{PipelineState, Slide, StateField, StateUpdate};

/// Arguments of the `image_keyword` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordArgs {
    /// Slide title.
    pub title: String,
    /// Slide body.
    pub content: String,
}

/// Placeholder image for a keyword, used when no image could be found.
#[must_use]
pub fn placeholder_image_url(keyword: &str) -> String {
    format!(
        "https://dummyimage.com/600x400/cccccc/000000&text={}",
        keyword.trim().replace(' ', "+")
    )
}

/// Attaches an image keyword and URL to every slide.
pub struct MediaStage {
    keyword: SharedOperation<KeywordArgs, String, ServiceError>,
    image_url: SharedOperation<String, String, ServiceError>,
}

impl MediaStage {
    /// Stage name.
    pub const NAME: &'static str = "media";

    /// Creates the stage with cached keyword and image lookups.
    pub fn new(images: Arc<dyn ImageSource>, cache: Arc<ResultCache>) -> Self {
        let source = images.clone();
        let keyword = operation("image_keyword", move |args: KeywordArgs| {
            let source = source.clone();
            async move { source.keyword(&args.title, &args.content).await }
        });
        let image_url = operation("image_url", move |keyword: String| {
            let images = images.clone();
            async move { images.image_url(&keyword).await }
        });

        let blank = |s: &String| s.trim().is_empty();
        Self {
            keyword: Arc::new(cached(keyword, cache.clone()).skip_when(blank)),
            image_url: Arc::new(cached(image_url, cache).skip_when(blank)),
        }
    }

    async fn keyword_for(&self, slide: &Slide) -> String {
        let args = KeywordArgs {
            title: slide.title.clone(),
            content: slide.content.clone(),
        };
        match self.keyword.call(&args).await {
            Ok(keyword) if !keyword.trim().is_empty() => keyword.trim().to_string(),
            Ok(_) => slide.title.clone(),
            Err(e) => {
                tracing::warn!(stage = Self::NAME, title = %slide.title, error = %e, "Keyword lookup failed, using title");
                slide.title.clone()
            }
        }
    }

    async fn url_for(&self, keyword: &str) -> String {
        match self.image_url.call(&keyword.to_string()).await {
            Ok(url) if !url.trim().is_empty() => url,
            Ok(_) => placeholder_image_url(keyword),
            Err(e) => {
                tracing::warn!(stage = Self::NAME, keyword, error = %e, "Image lookup failed, using placeholder");
                placeholder_image_url(keyword)
            }
        }
    }
}

impl fmt::Debug for MediaStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStage")
            .field("ops", &[self.keyword.name(), self.image_url.name()])
            .finish()
    }
}

#[async_trait]
impl Stage for MediaStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn writes(&self) -> &[StateField] {
        &[StateField::Slides]
    }

    async fn run(&self, state: &PipelineState) -> StateUpdate {
        if state.slides.is_empty() {
            tracing::warn!(stage = Self::NAME, "No slides, skipping images");
            return StateUpdate::slides(Vec::new());
        }

        let mut slides = Vec::with_capacity(state.slides.len());
        for slide in &state.slides {
            let keyword = self.keyword_for(slide).await;
            let url = self.url_for(&keyword).await;
            slides.push(slide.clone().with_image(keyword, url));
        }

        tracing::info!(stage = Self::NAME, slides = slides.len(), "Images attached");
        StateUpdate::slides(slides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::ports::MockImageSource;
    use crate::state::Depth;

    fn state(slides: Vec<Slide>) -> PipelineState {
        let mut state = PipelineState::new("Rust", 1, "Arial", Depth::Concise);
        state.slides = slides;
        state
    }

    fn stage(images: MockImageSource) -> MediaStage {
        MediaStage::new(Arc::new(images), Arc::new(ResultCache::in_memory()))
    }

    #[test]
    fn test_placeholder_url_encodes_spaces() {
        assert_eq!(
            placeholder_image_url("solar panels"),
            "https://dummyimage.com/600x400/cccccc/000000&text=solar+panels"
        );
    }

    #[tokio::test]
    async fn test_attaches_keyword_and_url() {
        let mut images = MockImageSource::new();
        images
            .expect_keyword()
            .returning(|_, _| Ok(" forest ".to_string()));
        images
            .expect_image_url()
            .withf(|kw| kw == "forest")
            .returning(|_| Ok("https://img/forest.png".to_string()));

        let update = stage(images)
            .run(&state(vec![Slide::new("Trees", "- oxygen")]))
            .await;

        assert_eq!(
            update.slides.unwrap(),
            vec![Slide::new("Trees", "- oxygen").with_image("forest", "https://img/forest.png")]
        );
    }

    #[tokio::test]
    async fn test_failures_fall_back_to_title_and_placeholder() {
        let mut images = MockImageSource::new();
        images
            .expect_keyword()
            .returning(|_, _| Err(ServiceError::transient("images", "timeout")));
        images.expect_image_url().returning(|_| Ok(String::new()));

        let update = stage(images)
            .run(&state(vec![Slide::new("Ocean Life", "- fish")]))
            .await;
        let slide = &update.slides.unwrap()[0];

        assert_eq!(slide.image_keyword.as_deref(), Some("Ocean Life"));
        assert_eq!(
            slide.image_url.as_deref(),
            Some("https://dummyimage.com/600x400/cccccc/000000&text=Ocean+Life")
        );
    }

    #[tokio::test]
    async fn test_empty_slides_stay_empty() {
        let mut images = MockImageSource::new();
        images.expect_keyword().never();

        let update = stage(images).run(&state(Vec::new())).await;
        assert_eq!(update.slides, Some(Vec::new()));
    }
}
