//! Decides whether an existing caption file can be kept.

use crate::text::count_words;
use app_state::CaptioningSettings;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenReason {
    Forced,
    Missing,
    /// Unreadable, or not valid UTF-8.
    Malformed,
    Empty,
    /// More words than `max_caption_words`.
    Stale { words: usize },
}

impl fmt::Display for RegenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forced => write!(f, "forced"),
            Self::Missing => write!(f, "missing"),
            Self::Malformed => write!(f, "malformed"),
            Self::Empty => write!(f, "empty"),
            Self::Stale { words } => write!(f, "stale ({words} words)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resumability {
    Done,
    Needed(RegenReason),
}

/// Checks the caption at `path`. Never fails: anything that is not a readable,
/// non-empty, short-enough caption needs regenerating.
#[must_use]
pub fn check_output(path: &Path, settings: &CaptioningSettings) -> Resumability {
    if settings.force_regenerate {
        return Resumability::Needed(RegenReason::Forced);
    }
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Resumability::Needed(RegenReason::Missing);
        }
        Err(_) => return Resumability::Needed(RegenReason::Malformed),
    };
    match count_words(&text) {
        0 => Resumability::Needed(RegenReason::Empty),
        words if words > settings.max_caption_words => {
            Resumability::Needed(RegenReason::Stale { words })
        }
        _ => Resumability::Done,
    }
}
