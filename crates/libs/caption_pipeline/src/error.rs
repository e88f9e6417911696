use language_model::LlmError;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single work item did not end with a caption file. Never fatal to a run.
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("remote captioning failed: {0}")]
    Remote(#[from] LlmError),
    #[error("cannot derive caption path for {}: {reason}", path.display())]
    Naming { path: PathBuf, reason: &'static str },
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("run was cancelled before the item was captioned")]
    Cancelled,
}

impl ItemError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote(e) if e.is_retryable())
    }
}
