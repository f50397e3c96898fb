//! Deterministic service ports for tests and demos.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ServiceError;
use crate::stages::{
    ContentWriter, DocumentRenderer, ImageSource, OutlinePlanner, PresentationPorts, RenderRequest,
    ResearchSource, WriteRequest,
};
use crate::state::{Depth, OutlineItem, Slide};

/// Returns `slide_count` numbered outline items.
#[derive(Debug, Default)]
pub struct StubPlanner {
    calls: AtomicUsize,
}

impl StubPlanner {
    /// Number of calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OutlinePlanner for StubPlanner {
    async fn plan(&self, topic: &str, slide_count: u32, _depth: Depth) -> Result<Vec<OutlineItem>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((1..=slide_count)
            .map(|i| OutlineItem::new(format!("{topic} part {i}"), format!("Aspect {i} of {topic}")))
            .collect())
    }
}

/// Returns one fixed snippet per query.
#[derive(Debug, Default)]
pub struct StubResearch {
    calls: AtomicUsize,
}

impl StubResearch {
    /// Number of calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResearchSource for StubResearch {
    async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<String>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![format!("A fact about {query}")])
    }
}

/// Writes a fixed body for every outline item.
#[derive(Debug, Default)]
pub struct StubWriter {
    calls: AtomicUsize,
}

impl StubWriter {
    /// Number of calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentWriter for StubWriter {
    async fn write(&self, request: &WriteRequest) -> Result<Vec<Slide>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(request
            .outline
            .iter()
            .map(|item| Slide::new(item.title.clone(), format!("- {}", item.description)))
            .collect())
    }
}

/// Uses the slide title as keyword and a fixed image host.
#[derive(Debug, Default)]
pub struct StubImages {
    calls: AtomicUsize,
}

impl StubImages {
    /// Number of calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageSource for StubImages {
    async fn keyword(&self, title: &str, _content: &str) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(title.to_lowercase())
    }

    async fn image_url(&self, keyword: &str) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("https://images.test/{}.png", keyword.replace(' ', "-")))
    }
}

/// Pretends to render and returns a fixed path.
#[derive(Debug)]
pub struct StubRenderer {
    path: String,
    calls: AtomicUsize,
}

impl StubRenderer {
    /// Creates a renderer that always reports `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentRenderer for StubRenderer {
    async fn render(&self, _request: &RenderRequest) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.path.clone())
    }
}

/// Fails every call with a permanent error.
#[derive(Debug, Default)]
pub struct FailingService;

impl FailingService {
    fn fail<T>(service: &str) -> Result<T, ServiceError> {
        Err(ServiceError::permanent(service, "service unavailable"))
    }
}

#[async_trait]
impl OutlinePlanner for FailingService {
    async fn plan(&self, _topic: &str, _slide_count: u32, _depth: Depth) -> Result<Vec<OutlineItem>, ServiceError> {
        Self::fail("planner")
    }
}

#[async_trait]
impl ResearchSource for FailingService {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<String>, ServiceError> {
        Self::fail("web_search")
    }
}

#[async_trait]
impl ContentWriter for FailingService {
    async fn write(&self, _request: &WriteRequest) -> Result<Vec<Slide>, ServiceError> {
        Self::fail("writer")
    }
}

#[async_trait]
impl ImageSource for FailingService {
    async fn keyword(&self, _title: &str, _content: &str) -> Result<String, ServiceError> {
        Self::fail("images")
    }

    async fn image_url(&self, _keyword: &str) -> Result<String, ServiceError> {
        Self::fail("images")
    }
}

#[async_trait]
impl DocumentRenderer for FailingService {
    async fn render(&self, _request: &RenderRequest) -> Result<String, ServiceError> {
        Self::fail("renderer")
    }
}

/// Ports backed by the stubs, with the renderer reporting `output_path`.
#[must_use]
pub fn stub_ports(output_path: impl Into<String>) -> PresentationPorts {
    PresentationPorts {
        planner: Arc::new(StubPlanner::default()),
        research: Arc::new(StubResearch::default()),
        writer: Arc::new(StubWriter::default()),
        images: Arc::new(StubImages::default()),
        renderer: Arc::new(StubRenderer::new(output_path)),
    }
}

/// Ports where every call fails.
#[must_use]
pub fn failing_ports() -> PresentationPorts {
    let failing = Arc::new(FailingService);
    PresentationPorts {
        planner: failing.clone(),
        research: failing.clone(),
        writer: failing.clone(),
        images: failing.clone(),
        renderer: failing,
    }
}
