//! Finds `<split>_mask` folders and the masks inside them.

use crate::mask_name::split_of_mask_dir;
use app_state::folder_label;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// A `<split>_mask` folder with its sibling `<split>` image folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSplit {
    pub split: String,
    pub mask_dir: PathBuf,
    pub image_dir: PathBuf,
}

impl DatasetSplit {
    /// `dataset/split_mask`, used in logs and progress bars.
    #[must_use]
    pub fn label(&self) -> String {
        folder_label(&self.mask_dir)
    }
}

/// Walks `root` for mask folders of the wanted splits (any split when
/// `splits` is empty). Folders without a sibling image folder are skipped.
/// Results are sorted by path.
#[must_use]
pub fn discover_splits(root: &Path, splits: &[String]) -> Vec<DatasetSplit> {
    let mut found: Vec<DatasetSplit> = WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {e}", root.display());
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| {
            let mask_dir = entry.into_path();
            let split = split_of_mask_dir(&mask_dir)?.to_string();
            if !splits.is_empty() && !splits.contains(&split) {
                return None;
            }
            let image_dir = mask_dir.with_file_name(&split);
            if !image_dir.is_dir() {
                warn!(
                    "Skipping {}: no image folder {}",
                    mask_dir.display(),
                    image_dir.display()
                );
                return None;
            }
            Some(DatasetSplit {
                split,
                mask_dir,
                image_dir,
            })
        })
        .collect();
    found.sort_by(|a, b| a.mask_dir.cmp(&b.mask_dir));
    found
}

/// Mask files directly inside `mask_dir` with extension `ext`
/// (case-insensitive), sorted by name. `limit` of 0 means all of them.
#[must_use]
pub fn enumerate_masks(mask_dir: &Path, ext: &str, limit: usize) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(mask_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read {}: {e}", mask_dir.display());
            return Vec::new();
        }
    };
    let mut masks: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        })
        .collect();
    masks.sort();
    if limit > 0 {
        masks.truncate(limit);
    }
    masks
}
