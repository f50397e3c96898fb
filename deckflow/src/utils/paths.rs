//! File name helpers.

use regex::Regex;
use std::sync::OnceLock;

/// Runs of characters not allowed in a file stem.
fn non_alphanumeric() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9]+").expect("file stem pattern must compile"))
}

/// Collapses every run of non-alphanumeric characters to `_`.
///
/// Leading and trailing underscores are dropped. An input with no usable
/// characters becomes `untitled`.
#[must_use]
pub fn sanitize_file_stem(raw: &str) -> String {
    let stem = non_alphanumeric().replace_all(raw.trim(), "_");
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "untitled".to_string()
    } else {
        stem.to_string()
    }
}

/// File name of the rendered deck for a topic.
#[must_use]
pub fn presentation_file_name(topic: &str) -> String {
    format!("{}_presentation.pptx", sanitize_file_stem(topic))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_collapses_runs() {
        assert_eq!(sanitize_file_stem("Climate Change"), "Climate_Change");
        assert_eq!(sanitize_file_stem("AI / ML: 2024!"), "AI_ML_2024");
        assert_eq!(sanitize_file_stem("  ../etc/passwd "), "etc_passwd");
    }

    #[test]
    fn test_sanitize_empty_input() {
        assert_eq!(sanitize_file_stem("!!!"), "untitled");
    }

    #[test]
    fn test_presentation_file_name() {
        assert_eq!(
            presentation_file_name("Climate Change"),
            "Climate_Change_presentation.pptx"
        );
    }
}
