use crate::mask_name::MaskMetadata;
use std::fmt;

#[must_use]
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionProblem {
    Empty,
    TooLong { words: usize },
}

impl fmt::Display for CaptionProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "caption empty"),
            Self::TooLong { words } => write!(f, "caption too long ({words} words)"),
        }
    }
}

/// A caption is usable when it has at least one word and at most `max_words`.
pub fn validate_caption(text: &str, max_words: usize) -> Result<(), CaptionProblem> {
    match count_words(text) {
        0 => Err(CaptionProblem::Empty),
        words if words > max_words => Err(CaptionProblem::TooLong { words }),
        _ => Ok(()),
    }
}

/// Deterministic caption used once the model could not produce a valid one.
/// The full form is shortened to `"Segment <target>"`, and then cut to
/// `max_words`, so the result always passes [`validate_caption`].
#[must_use]
pub fn fallback_caption(meta: &MaskMetadata, max_words: usize) -> String {
    let full = collapse_whitespace(&format!(
        "Segment {} in {} {}",
        meta.target, meta.site, meta.modality
    ));
    if count_words(&full) <= max_words {
        return full;
    }
    format!("Segment {}", meta.target)
        .split_whitespace()
        .take(max_words.max(1))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Offline caption of the form `"<Target> in <site> <modality>"`,
/// e.g. `"Enhancing tumor in brain MRI"`.
#[must_use]
pub fn simple_caption(meta: &MaskMetadata) -> String {
    let caption = collapse_whitespace(&format!(
        "{} in {} {}",
        meta.target, meta.site, meta.modality
    ));
    capitalize_first(&caption)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
