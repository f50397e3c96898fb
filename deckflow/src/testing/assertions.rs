//! Assertions over pipeline state.

use crate::state::{PipelineState, StateField};

/// Asserts that every derived field was produced.
///
/// Requires a non-empty outline, one slide with content per outline item,
/// an image on every slide and a document path.
pub fn assert_state_complete(state: &PipelineState) {
    assert!(!state.outline.is_empty(), "Expected an outline, got none");
    assert_eq!(
        state.slides.len(),
        state.outline.len(),
        "Expected one slide per outline item"
    );
    for slide in &state.slides {
        assert!(!slide.content.is_empty(), "Slide '{}' has no content", slide.title);
        assert!(slide.image_url.is_some(), "Slide '{}' has no image", slide.title);
    }
    assert!(state.has_output(), "Expected a document path, got none");
}

/// Asserts the cross-field invariants that hold for every run.
///
/// Research notes are keyed by outline titles, slides only exist once an
/// outline does, every image URL comes with its keyword, and a document path
/// implies slides exist.
pub fn assert_structurally_complete(state: &PipelineState) {
    for title in state.research_notes.keys() {
        assert!(
            state.outline.iter().any(|item| &item.title == title),
            "Research notes for '{title}', which is not an outline title"
        );
    }
    if !state.slides.is_empty() {
        assert!(!state.outline.is_empty(), "Slides produced without an outline");
    }
    for slide in &state.slides {
        assert!(!slide.title.is_empty(), "Slide without a title: {slide:?}");
        if slide.image_url.is_some() {
            assert!(
                slide.image_keyword.is_some(),
                "Slide '{}' has an image but no keyword",
                slide.title
            );
        }
    }
    if state.has_output() {
        assert!(
            !state.slides.is_empty(),
            "Document '{}' produced without slides",
            state.output_path
        );
    }
}

/// Asserts that `fields` hold the same values in `before` and `after`.
pub fn assert_fields_unchanged(before: &PipelineState, after: &PipelineState, fields: &[StateField]) {
    for field in fields {
        let same = match field {
            StateField::Topic => before.topic == after.topic,
            StateField::SlideCount => before.slide_count == after.slide_count,
            StateField::Font => before.font == after.font,
            StateField::Depth => before.depth == after.depth,
            StateField::Outline => before.outline == after.outline,
            StateField::ResearchNotes => before.research_notes == after.research_notes,
            StateField::Slides => before.slides == after.slides,
            StateField::OutputPath => before.output_path == after.output_path,
        };
        assert!(same, "Field '{field}' changed");
    }
}
