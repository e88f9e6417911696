//! Minimal client for OpenAI-compatible chat-completions endpoints (plain or
//! Azure-hosted). One call per request; retry policy lives with the caller.
#![deny(clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

mod api;

pub use api::*;
pub use reqwest::StatusCode;
