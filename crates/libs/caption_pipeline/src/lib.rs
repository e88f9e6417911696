//! Captions segmentation masks with a remote language model.
//!
//! Mask folders named `<split>_mask` are scanned, captions that are missing or
//! invalid are requested with bounded concurrency and retries, and each caption
//! is written to `<split>_caption/<mask stem>.txt`. Reruns skip finished work.
#![deny(clippy::unwrap_used)]

mod captioner;
mod driver;
mod enumerate;
mod error;
mod gate;
mod mask_name;
mod progress;
mod prompt;
mod resume;
mod retry;
mod scheduler;
mod service;
mod stats;
mod text;
mod work_item;
mod writer;

pub use captioner::*;
pub use driver::*;
pub use enumerate::*;
pub use error::*;
pub use gate::*;
pub use mask_name::*;
pub use progress::*;
pub use prompt::*;
pub use resume::*;
pub use retry::*;
pub use scheduler::*;
pub use service::*;
pub use stats::*;
pub use text::*;
pub use work_item::*;
pub use writer::*;
