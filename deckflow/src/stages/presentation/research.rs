use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::cache::ResultCache;
use crate::errors::ServiceError;
use crate::interceptors::{cached, operation, retrying, Operation, SharedOperation};
use crate::pipeline::RetryPolicy;
use crate::stages::{ResearchSource, Stage};
use crate::state::{OutlineItem, PipelineState, ResearchNotes, StateField, StateUpdate};

/// Snippets kept per outline item.
pub const MAX_SNIPPETS: usize = 3;

/// Arguments of the `web_search` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchArgs {
    /// Search query.
    pub query: String,
    /// Result limit.
    pub max_results: usize,
}

/// Builds the search query for an outline item.
///
/// Only `:` and spaces are trimmed from the ends.
#[must_use]
pub fn research_query(item: &OutlineItem) -> String {
    format!("{}: {}", item.title, item.description)
        .trim_matches(|c: char| c == ':' || c == ' ')
        .to_string()
}

/// Formats snippets as `- snippet` lines, keeping at most [`MAX_SNIPPETS`].
#[must_use]
pub fn format_snippets(snippets: &[String]) -> String {
    snippets
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .take(MAX_SNIPPETS)
        .map(|s| format!("- {s}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collects background facts for every outline item.
pub struct ResearchStage {
    search: SharedOperation<SearchArgs, Vec<String>, ServiceError>,
}

impl ResearchStage {
    /// Stage name.
    pub const NAME: &'static str = "research";

    /// Creates the stage with retried, cached searches.
    ///
    /// Empty result sets are not cached, so a search that found nothing is
    /// tried again on the next run.
    pub fn new(source: Arc<dyn ResearchSource>, policy: RetryPolicy, cache: Arc<ResultCache>) -> Self {
        let call = operation("web_search", move |args: SearchArgs| {
            let source = source.clone();
            async move { source.search(&args.query, args.max_results).await }
        });
        let op = cached(retrying(call, policy).retry_if(ServiceError::is_retryable), cache)
            .skip_when(Vec::is_empty);
        Self { search: Arc::new(op) }
    }
}

impl fmt::Debug for ResearchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResearchStage")
            .field("op", &self.search.name())
            .finish()
    }
}

#[async_trait]
impl Stage for ResearchStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn writes(&self) -> &[StateField] {
        &[StateField::ResearchNotes]
    }

    async fn run(&self, state: &PipelineState) -> StateUpdate {
        let mut notes = ResearchNotes::new();
        if state.outline.is_empty() {
            tracing::warn!(stage = Self::NAME, "No outline, skipping research");
            return StateUpdate::research_notes(notes);
        }

        for item in &state.outline {
            let query = research_query(item);
            if query.is_empty() {
                tracing::debug!(stage = Self::NAME, "Empty query, skipping item");
                continue;
            }

            let args = SearchArgs {
                query,
                max_results: MAX_SNIPPETS,
            };
            let text = match self.search.call(&args).await {
                Ok(snippets) => format_snippets(&snippets),
                Err(e) => {
                    tracing::warn!(
                        stage = Self::NAME,
                        title = %item.title,
                        error = %e,
                        "Search failed, continuing without notes"
                    );
                    String::new()
                }
            };
            notes.insert(item.title.clone(), text);
        }

        tracing::info!(stage = Self::NAME, items = notes.len(), "Research collected");
        StateUpdate::research_notes(notes)
    }
}
