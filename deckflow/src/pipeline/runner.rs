//! Sequential pipeline execution.

use serde_json::json;
use std::sync::Arc;
use tracing::Instrument;

use super::PipelineBuilder;
use crate::errors::{DeckflowError, InputValidationError};
use crate::events::{self, EventSink};
use crate::observability::StageTimer;
use crate::stages::Stage;
use crate::state::{PipelineState, StateUpdate};
use crate::utils::generate_run_id;

/// Runs a fixed, ordered list of stages over a [`PipelineState`].
///
/// Each stage sees the state as merged from every earlier stage. The order is
/// set at construction and never changes.
pub struct PipelineRunner {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

impl PipelineRunner {
    pub(super) fn new(name: String, stages: Vec<Arc<dyn Stage>>, sink: Arc<dyn EventSink>) -> Self {
        Self { name, stages, sink }
    }

    /// Starts building a runner.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(name)
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Checks that the first stage's required fields are present.
    pub fn validate_input(&self, initial: &PipelineState) -> Result<(), InputValidationError> {
        let Some(first) = self.stages.first() else {
            return Ok(());
        };
        match first.requires().iter().find(|field| initial.is_empty(**field)) {
            Some(field) => Err(InputValidationError::missing_field(first.name(), *field)),
            None => Ok(()),
        }
    }

    /// Runs every stage in order and returns the final state.
    ///
    /// Only input validation and a stage writing a field it does not own are
    /// errors. Stage-level failures show up as empty fields.
    pub async fn run(&self, initial: PipelineState) -> Result<PipelineState, DeckflowError> {
        let run_id = generate_run_id();
        let span = tracing::info_span!("pipeline", pipeline = %self.name, run_id = %run_id);
        self.run_inner(&run_id, initial).instrument(span).await
    }

    async fn run_inner(&self, run_id: &str, initial: PipelineState) -> Result<PipelineState, DeckflowError> {
        let mut payload = events::run_payload(run_id, &initial.topic);

        if let Err(e) = self.validate_input(&initial) {
            tracing::warn!(code = %e.code, error = %e, "Pipeline input rejected");
            payload["error"] = json!(e.to_dict());
            self.sink.emit(events::PIPELINE_REJECTED, Some(payload)).await;
            return Err(e.into());
        }

        payload["stages"] = json!(self.stage_names());
        self.sink.emit(events::PIPELINE_STARTED, Some(payload)).await;
        tracing::info!(stages = self.stages.len(), "Pipeline started");

        let mut state = initial;
        for stage in &self.stages {
            let name = stage.name();
            self.sink
                .emit(events::STAGE_STARTED, Some(json!({"run_id": run_id, "stage": name})))
                .await;

            let timer = StageTimer::start(name);
            let update = stage.run(&state).instrument(tracing::debug_span!("stage", stage = name)).await;
            let duration_ms = timer.finish();

            check_contract(stage.as_ref(), &update)?;
            let fields: Vec<&str> = update.fields().iter().map(|f| f.as_str()).collect();
            tracing::debug!(stage = name, duration_ms, fields = ?fields, "Stage completed");
            self.sink
                .emit(
                    events::STAGE_COMPLETED,
                    Some(json!({
                        "run_id": run_id,
                        "stage": name,
                        "duration_ms": duration_ms,
                        "fields": fields,
                    })),
                )
                .await;

            update.apply_to(&mut state);
        }

        tracing::info!(output = %state.output_path, "Pipeline completed");
        self.sink
            .emit(
                events::PIPELINE_COMPLETED,
                Some(json!({
                    "run_id": run_id,
                    "slides": state.slides.len(),
                    "output_path": state.output_path,
                })),
            )
            .await;
        Ok(state)
    }
}

fn check_contract(stage: &dyn Stage, update: &StateUpdate) -> Result<(), DeckflowError> {
    match update.fields().into_iter().find(|f| !stage.writes().contains(f)) {
        Some(field) => {
            tracing::error!(stage = stage.name(), field = %field, "Stage wrote a field it does not own");
            Err(DeckflowError::StageContract {
                stage: stage.name().to_string(),
                field,
            })
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use crate::stages::FnStage;
    use crate::state::{Depth, OutlineItem, Slide, StateField};
    use crate::testing::{MockStage, RecordingStage};

    fn initial(topic: &str) -> PipelineState {
        PipelineState::new(topic, 2, "Arial", Depth::Concise)
    }

    fn outline_stage() -> Arc<dyn Stage> {
        Arc::new(
            FnStage::new("outline", |s: &PipelineState| {
                StateUpdate::outline(vec![OutlineItem::new(format!("{} intro", s.topic), "")])
            })
            .with_requires(&[StateField::Topic])
            .with_writes(&[StateField::Outline]),
        )
    }

    #[tokio::test]
    async fn test_stages_see_prior_updates() {
        let slides = FnStage::new("content", |s: &PipelineState| {
            StateUpdate::slides(s.outline.iter().map(|o| Slide::new(o.title.clone(), "body")).collect())
        })
        .with_writes(&[StateField::Slides]);

        let runner = PipelineRunner::builder("test")
            .stage(outline_stage())
            .stage(Arc::new(slides))
            .build()
            .unwrap();

        let state = runner.run(initial("Rust")).await.unwrap();
        assert_eq!(state.slides, vec![Slide::new("Rust intro", "body")]);
    }

    #[tokio::test]
    async fn test_missing_required_field_rejects_before_any_stage() {
        let sink = Arc::new(CollectingEventSink::new());
        let runner = PipelineRunner::builder("test")
            .stage(outline_stage())
            .with_event_sink(sink.clone())
            .build()
            .unwrap();

        let err = runner.run(initial("  ")).await.unwrap_err();

        assert!(err.is_validation());
        assert_eq!(sink.event_types(), vec![events::PIPELINE_REJECTED]);
    }

    #[tokio::test]
    async fn test_undeclared_write_is_a_contract_error() {
        let rogue = FnStage::new("rogue", |_: &PipelineState| StateUpdate::output_path("x"))
            .with_writes(&[StateField::Slides]);
        let runner = PipelineRunner::builder("test")
            .stage(Arc::new(rogue))
            .build()
            .unwrap();

        let err = runner.run(initial("Rust")).await.unwrap_err();
        assert!(matches!(
            err,
            DeckflowError::StageContract { ref stage, field: StateField::OutputPath } if stage == "rogue"
        ));
    }

    #[tokio::test]
    async fn test_event_sequence() {
        let sink = Arc::new(CollectingEventSink::new());
        let runner = PipelineRunner::builder("test")
            .stage(outline_stage())
            .with_event_sink(sink.clone())
            .build()
            .unwrap();

        runner.run(initial("Rust")).await.unwrap();

        assert_eq!(
            sink.event_types(),
            vec![
                events::PIPELINE_STARTED,
                events::STAGE_STARTED,
                events::STAGE_COMPLETED,
                events::PIPELINE_COMPLETED,
            ]
        );
        let completed = &sink.events_of_type(events::STAGE_COMPLETED)[0];
        assert_eq!(completed.1.as_ref().unwrap()["fields"], json!(["outline"]));
    }

    #[tokio::test]
    async fn test_earlier_stages_never_see_later_writes() {
        let before = Arc::new(RecordingStage::new("before"));
        let between = Arc::new(RecordingStage::new("between"));
        let after = Arc::new(RecordingStage::new("after"));
        let content = MockStage::returning("content", StateUpdate::slides(vec![Slide::new("Rust intro", "body")]));

        let runner = PipelineRunner::builder("test")
            .stage(before.clone())
            .stage(outline_stage())
            .stage(between.clone())
            .stage(Arc::new(content))
            .stage(after.clone())
            .build()
            .unwrap();
        let last = runner.run(initial("Rust")).await.unwrap();

        let first = &before.observed()[0];
        for field in StateField::DERIVED {
            assert!(first.is_empty(field), "{field} visible before it was written");
        }

        let middle = &between.observed()[0];
        assert_eq!(middle.outline, vec![OutlineItem::new("Rust intro", "")]);
        assert!(middle.slides.is_empty());

        let end = &after.observed()[0];
        assert_eq!(end.outline, middle.outline);
        assert_eq!(end.slides, vec![Slide::new("Rust intro", "body")]);
        assert_eq!(&last, end);
    }

    #[test]
    fn test_stage_names_in_order() {
        let runner = PipelineRunner::builder("test")
            .stage(outline_stage())
            .stage(Arc::new(crate::stages::NoOpStage::new("noop")))
            .build()
            .unwrap();
        assert_eq!(runner.stage_names(), vec!["outline", "noop"]);
    }
}
