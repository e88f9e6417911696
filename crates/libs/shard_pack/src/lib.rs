//! Packs captioned segmentation samples into tar shards for training.
//!
//! Each sample bundles a source image, its mask and the first line of the
//! mask's caption under a key derived from the two image paths. Shards are
//! numbered tar files with a fixed maximum number of samples.
#![deny(clippy::unwrap_used)]

mod pack;
mod sample;
mod shard;

pub use pack::*;
pub use sample::*;
pub use shard::*;
