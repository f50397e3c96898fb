use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::cache::ResultCache;
use crate::errors::ServiceError;
use crate::interceptors::{cached, operation, retrying, Operation, SharedOperation};
use crate::pipeline::RetryPolicy;
use crate::stages::{recover, OutlinePlanner, Stage};
use crate::state::{Depth, OutlineItem, PipelineState, StateField, StateUpdate};

/// Arguments of the `generate_outline` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineArgs {
    /// Trimmed topic.
    pub topic: String,
    /// Requested slide count.
    pub slide_count: u32,
    /// Content depth the outline is planned for.
    pub depth: Depth,
}

/// Plans the outline from the topic.
pub struct OutlineStage {
    plan: SharedOperation<OutlineArgs, Vec<OutlineItem>, ServiceError>,
}

impl OutlineStage {
    /// Stage name.
    pub const NAME: &'static str = "outline";

    /// Creates the stage with retried, cached planner calls.
    pub fn new(planner: Arc<dyn OutlinePlanner>, policy: RetryPolicy, cache: Arc<ResultCache>) -> Self {
        let call = operation("generate_outline", move |args: OutlineArgs| {
            let planner = planner.clone();
            async move { planner.plan(&args.topic, args.slide_count, args.depth).await }
        });
        let op = cached(retrying(call, policy).retry_if(ServiceError::is_retryable), cache)
            .skip_when(Vec::is_empty);
        Self { plan: Arc::new(op) }
    }
}

impl fmt::Debug for OutlineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutlineStage")
            .field("op", &self.plan.name())
            .finish()
    }
}

#[async_trait]
impl Stage for OutlineStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn requires(&self) -> &[StateField] {
        &[StateField::Topic]
    }

    fn writes(&self) -> &[StateField] {
        &[StateField::Outline]
    }

    async fn run(&self, state: &PipelineState) -> StateUpdate {
        let topic = state.topic.trim();
        if topic.is_empty() {
            tracing::warn!(stage = Self::NAME, "No topic, skipping planning");
            return StateUpdate::outline(Vec::new());
        }

        let args = OutlineArgs {
            topic: topic.to_string(),
            slide_count: state.slide_count,
            depth: state.depth,
        };
        let outline = recover(Self::NAME, "Outline planning", self.plan.call(&args).await);
        tracing::info!(stage = Self::NAME, items = outline.len(), "Outline planned");
        StateUpdate::outline(outline)
    }
}
