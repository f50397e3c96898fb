//! State record and value types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Research notes keyed by slide title.
///
/// A `BTreeMap` keeps serialization order stable, which matters for cache keys.
pub type ResearchNotes = BTreeMap<String, String>;

/// How much text each slide should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Depth {
    /// A few words per bullet.
    Minimal,
    /// Short bullets.
    #[default]
    Concise,
    /// Full sentences.
    Detailed,
}

impl Depth {
    /// All depth values, in increasing verbosity.
    pub const ALL: [Self; 3] = [Self::Minimal, Self::Concise, Self::Detailed];

    /// Returns the canonical name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "Minimal",
            Self::Concise => "Concise",
            Self::Detailed => "Detailed",
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Depth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown depth '{s}' (expected Minimal, Concise or Detailed)"))
    }
}

/// One planned slide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OutlineItem {
    /// Slide title.
    pub title: String,
    /// What the slide should cover.
    pub description: String,
}

impl OutlineItem {
    /// Creates a new outline item.
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// A written slide, optionally illustrated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Slide {
    /// Slide title.
    pub title: String,
    /// Body text (bullets separated by newlines).
    pub content: String,
    /// Search keyword used to find an image.
    #[serde(default)]
    pub image_keyword: Option<String>,
    /// URL of the chosen image.
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Slide {
    /// Creates a slide without image data.
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            image_keyword: None,
            image_url: None,
        }
    }

    /// Returns a copy with image data attached.
    #[must_use]
    pub fn with_image(mut self, keyword: impl Into<String>, url: impl Into<String>) -> Self {
        self.image_keyword = Some(keyword.into());
        self.image_url = Some(url.into());
        self
    }
}

/// Names of the fields of [`PipelineState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    /// Presentation topic.
    Topic,
    /// Requested slide count.
    SlideCount,
    /// Font name.
    Font,
    /// Content depth.
    Depth,
    /// Planned outline.
    Outline,
    /// Research notes per slide title.
    ResearchNotes,
    /// Written slides.
    Slides,
    /// Path of the rendered document.
    OutputPath,
}

impl StateField {
    /// Fields a stage may write. Input fields are fixed for the whole run.
    pub const DERIVED: [Self; 4] = [
        Self::Outline,
        Self::ResearchNotes,
        Self::Slides,
        Self::OutputPath,
    ];

    /// Returns the snake_case field name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::SlideCount => "slide_count",
            Self::Font => "font",
            Self::Depth => "depth",
            Self::Outline => "outline",
            Self::ResearchNotes => "research_notes",
            Self::Slides => "slides",
            Self::OutputPath => "output_path",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The record threaded through every stage of a run.
///
/// Every field is always present; "not produced yet" and "produced nothing"
/// are both represented as emptiness.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PipelineState {
    /// Presentation topic.
    pub topic: String,
    /// Requested number of slides.
    pub slide_count: u32,
    /// Font used when rendering.
    pub font: String,
    /// Content depth.
    pub depth: Depth,
    /// Planned outline.
    #[serde(default)]
    pub outline: Vec<OutlineItem>,
    /// Research notes keyed by slide title.
    #[serde(default)]
    pub research_notes: ResearchNotes,
    /// Written slides.
    #[serde(default)]
    pub slides: Vec<Slide>,
    /// Path of the rendered document, empty until produced.
    #[serde(default)]
    pub output_path: String,
}

impl PipelineState {
    /// Creates an initial state with empty derived fields.
    #[must_use]
    pub fn new(topic: impl Into<String>, slide_count: u32, font: impl Into<String>, depth: Depth) -> Self {
        Self {
            topic: topic.into(),
            slide_count,
            font: font.into(),
            depth,
            ..Self::default()
        }
    }

    /// Returns true if the named field holds its empty/default value.
    #[must_use]
    pub fn is_empty(&self, field: StateField) -> bool {
        match field {
            StateField::Topic => self.topic.trim().is_empty(),
            StateField::SlideCount => self.slide_count == 0,
            StateField::Font => self.font.trim().is_empty(),
            // Every depth is a valid value.
            StateField::Depth => false,
            StateField::Outline => self.outline.is_empty(),
            StateField::ResearchNotes => self.research_notes.is_empty(),
            StateField::Slides => self.slides.is_empty(),
            StateField::OutputPath => self.output_path.is_empty(),
        }
    }

    /// Returns true if a document was produced.
    #[must_use]
    pub fn has_output(&self) -> bool {
        !self.output_path.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_parse_is_case_insensitive() {
        assert_eq!("concise".parse::<Depth>().unwrap(), Depth::Concise);
        assert_eq!(" Detailed ".parse::<Depth>().unwrap(), Depth::Detailed);
        assert!("verbose".parse::<Depth>().is_err());
    }

    #[test]
    fn test_depth_default_is_concise() {
        assert_eq!(Depth::default(), Depth::Concise);
    }

    #[test]
    fn test_new_state_has_empty_derived_fields() {
        let state = PipelineState::new("Climate Change", 3, "Arial", Depth::Concise);

        for field in StateField::DERIVED {
            assert!(state.is_empty(field), "{field} should start empty");
        }
        assert!(!state.is_empty(StateField::Topic));
        assert!(!state.has_output());
    }

    #[test]
    fn test_whitespace_topic_counts_as_empty() {
        let state = PipelineState::new("   ", 3, "Arial", Depth::Minimal);
        assert!(state.is_empty(StateField::Topic));
    }

    #[test]
    fn test_state_deserializes_with_missing_derived_fields() {
        let json = serde_json::json!({
            "topic": "Rust",
            "slide_count": 2,
            "font": "Calibri",
            "depth": "Minimal",
        });
        let state: PipelineState = serde_json::from_value(json).unwrap();

        assert!(state.outline.is_empty());
        assert!(state.research_notes.is_empty());
        assert!(state.slides.is_empty());
        assert_eq!(state.output_path, "");
    }

    #[test]
    fn test_slide_with_image() {
        let slide = Slide::new("Intro", "- point").with_image("forest", "http://img");
        assert_eq!(slide.image_keyword.as_deref(), Some("forest"));
        assert_eq!(slide.image_url.as_deref(), Some("http://img"));
    }
}
