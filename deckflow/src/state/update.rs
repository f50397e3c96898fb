//! Partial state updates and merge semantics.

use serde::{Deserialize, Serialize};

use super::{OutlineItem, PipelineState, ResearchNotes, Slide, StateField};

/// The subset of derived fields a stage produced.
///
/// `None` means "not named by this update"; `Some(empty)` means "named, and
/// produced nothing". Merging only ever touches named fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateUpdate {
    /// New outline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Vec<OutlineItem>>,
    /// New research notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_notes: Option<ResearchNotes>,
    /// New slides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slides: Option<Vec<Slide>>,
    /// New output path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

impl StateUpdate {
    /// Creates an update that names no fields.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates an update setting the outline.
    #[must_use]
    pub fn outline(outline: Vec<OutlineItem>) -> Self {
        Self {
            outline: Some(outline),
            ..Self::default()
        }
    }

    /// Creates an update setting the research notes.
    #[must_use]
    pub fn research_notes(notes: ResearchNotes) -> Self {
        Self {
            research_notes: Some(notes),
            ..Self::default()
        }
    }

    /// Creates an update setting the slides.
    #[must_use]
    pub fn slides(slides: Vec<Slide>) -> Self {
        Self {
            slides: Some(slides),
            ..Self::default()
        }
    }

    /// Creates an update setting the output path.
    #[must_use]
    pub fn output_path(path: impl Into<String>) -> Self {
        Self {
            output_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Creates the empty-valued update for the given fields.
    ///
    /// This is the shape a stage degrades to on failure.
    #[must_use]
    pub fn empty_for(fields: &[StateField]) -> Self {
        let mut update = Self::default();
        for field in fields {
            match field {
                StateField::Outline => update.outline = Some(Vec::new()),
                StateField::ResearchNotes => update.research_notes = Some(ResearchNotes::new()),
                StateField::Slides => update.slides = Some(Vec::new()),
                StateField::OutputPath => update.output_path = Some(String::new()),
                StateField::Topic | StateField::SlideCount | StateField::Font | StateField::Depth => {}
            }
        }
        update
    }

    /// Returns the fields this update names.
    #[must_use]
    pub fn fields(&self) -> Vec<StateField> {
        let mut fields = Vec::new();
        if self.outline.is_some() {
            fields.push(StateField::Outline);
        }
        if self.research_notes.is_some() {
            fields.push(StateField::ResearchNotes);
        }
        if self.slides.is_some() {
            fields.push(StateField::Slides);
        }
        if self.output_path.is_some() {
            fields.push(StateField::OutputPath);
        }
        fields
    }

    /// Returns true if the update names no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Shallow per-field overwrite of `state` with the named fields.
    pub fn apply_to(self, state: &mut PipelineState) {
        if let Some(outline) = self.outline {
            state.outline = outline;
        }
        if let Some(notes) = self.research_notes {
            state.research_notes = notes;
        }
        if let Some(slides) = self.slides {
            state.slides = slides;
        }
        if let Some(path) = self.output_path {
            state.output_path = path;
        }
    }
}
