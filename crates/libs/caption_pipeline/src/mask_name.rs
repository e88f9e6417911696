//! Naming conventions shared by masks, images and captions.
//!
//! A mask file stem ends in `<modality>_<site>_<target>`, with `+` standing in
//! for spaces, e.g. `patient101_frame01_0_MRI_heart_left+heart+ventricle.png`.
//! Masks live in `<split>_mask`, captions in the sibling `<split>_<suffix>`.

use crate::error::ItemError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const MASK_DIR_SUFFIX: &str = "_mask";

/// Tokens that mark the modality field as an MR sequence rather than a modality.
const SEQUENCE_KEYWORDS: [&str; 9] = ["T1", "T2", "FLAIR", "ADC", "DWI", "SWI", "PD", "TOF", "MRA"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskMetadata {
    pub target: String,
    pub site: String,
    pub modality: String,
    /// Raw sequence label when the modality field named an MR sequence.
    pub sequence: Option<String>,
}

impl MaskMetadata {
    #[must_use]
    pub fn from_path(mask_path: &Path) -> Self {
        let stem = mask_path
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        Self::from_stem(&stem)
    }

    /// Parses the last three `_`-separated fields. Missing or blank fields
    /// fall back to `structure`, `region` and `imaging`.
    #[must_use]
    pub fn from_stem(stem: &str) -> Self {
        let mut fields = stem.rsplit('_').map(normalize_field);
        let mut next_or = |default: &str| {
            fields
                .next()
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let target = next_or("structure");
        let site = next_or("region");
        let raw_modality = next_or("imaging");

        let compact = raw_modality.to_uppercase().replace(' ', "");
        let (modality, sequence) = if SEQUENCE_KEYWORDS.iter().any(|k| compact.contains(k)) {
            ("MRI".to_string(), Some(raw_modality))
        } else {
            (raw_modality, None)
        };

        Self {
            target,
            site,
            modality,
            sequence,
        }
    }

    /// `"<sequence> <modality>"`, or just the modality.
    #[must_use]
    pub fn modality_description(&self) -> String {
        match &self.sequence {
            Some(sequence) => format!("{sequence} {}", self.modality),
            None => self.modality.clone(),
        }
    }
}

fn normalize_field(field: &str) -> String {
    field
        .replace('+', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split name of a mask directory: `train_mask` → `train`.
#[must_use]
pub fn split_of_mask_dir(mask_dir: &Path) -> Option<&str> {
    mask_dir
        .file_name()?
        .to_str()?
        .strip_suffix(MASK_DIR_SUFFIX)
        .filter(|split| !split.is_empty())
}

/// Caption file for a mask: `<root>/<split>_mask/<stem>.png` →
/// `<root>/<split>_<suffix>/<stem>.txt`.
///
/// Only the name of the mask's own parent directory is rewritten, and only its
/// trailing `_mask`. Ancestor directories and the file name are left alone even
/// when they contain `mask`.
///
/// # Errors
///
/// * The mask has no parent directory, or its parent is not named `<split>_mask`.
pub fn caption_path(mask_path: &Path, suffix: &str) -> Result<PathBuf, ItemError> {
    let naming = |reason| ItemError::Naming {
        path: mask_path.to_path_buf(),
        reason,
    };
    let mask_dir = mask_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| naming("mask has no parent directory"))?;
    let split =
        split_of_mask_dir(mask_dir).ok_or_else(|| naming("parent directory is not named <split>_mask"))?;
    let stem = mask_path
        .file_stem()
        .ok_or_else(|| naming("mask has no file name"))?;

    let mut file_name = OsString::from(stem);
    file_name.push(".txt");
    Ok(mask_dir
        .with_file_name(format!("{split}_{suffix}"))
        .join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_convention() {
        let meta = MaskMetadata::from_path(Path::new(
            "/data/ACDC/train_mask/patient101_frame01_0_MRI_heart_left+heart+ventricle.png",
        ));
        assert_eq!(meta.target, "left heart ventricle");
        assert_eq!(meta.site, "heart");
        assert_eq!(meta.modality, "MRI");
        assert_eq!(meta.sequence, None);
        assert_eq!(meta.modality_description(), "MRI");
    }

    #[test]
    fn sequence_labels_become_mri() {
        let meta = MaskMetadata::from_stem("BraTS_001_T1+Gd_brain_enhancing+tumor");
        assert_eq!(meta.modality, "MRI");
        assert_eq!(meta.sequence.as_deref(), Some("T1 Gd"));
        assert_eq!(meta.modality_description(), "T1 Gd MRI");

        let flair = MaskMetadata::from_stem("x_flair_brain_edema");
        assert_eq!(flair.sequence.as_deref(), Some("flair"));
    }

    #[test]
    fn stem_without_underscore_uses_defaults() {
        let meta = MaskMetadata::from_stem("liver");
        assert_eq!(meta.target, "liver");
        assert_eq!(meta.site, "region");
        assert_eq!(meta.modality, "imaging");
    }

    #[test]
    fn blank_fields_use_defaults() {
        let meta = MaskMetadata::from_stem("a__+");
        assert_eq!(meta.target, "structure");
        assert_eq!(meta.site, "region");
        assert_eq!(meta.modality, "a");
    }

    #[test]
    fn caption_path_rewrites_parent_segment_only() -> Result<(), ItemError> {
        let path = caption_path(
            Path::new("/data/mask_sets/DRIVE/train_mask/img_01_fundus_eye_vessel+mask.png"),
            "caption",
        )?;
        assert_eq!(
            path,
            Path::new("/data/mask_sets/DRIVE/train_caption/img_01_fundus_eye_vessel+mask.txt")
        );
        Ok(())
    }

    #[test]
    fn caption_path_supports_custom_suffix() -> Result<(), ItemError> {
        let path = caption_path(Path::new("ds/test_mask/a_CT_liver_tumor.png"), "simple_caption")?;
        assert_eq!(path, Path::new("ds/test_simple_caption/a_CT_liver_tumor.txt"));
        Ok(())
    }

    #[test]
    fn caption_path_keeps_dots_in_stem() -> Result<(), ItemError> {
        let path = caption_path(Path::new("ds/train_mask/case.01_CT_liver_liver.png"), "caption")?;
        assert_eq!(path, Path::new("ds/train_caption/case.01_CT_liver_liver.txt"));
        Ok(())
    }

    #[test]
    fn caption_path_anchors_on_trailing_mask() -> Result<(), ItemError> {
        // Only the final `_mask` goes; a `mask_` prefix stays.
        let path = caption_path(Path::new("ds/mask_train_mask/x.png"), "caption")?;
        assert_eq!(path, Path::new("ds/mask_train_caption/x.txt"));
        Ok(())
    }

    #[test]
    fn caption_path_rejects_unconventional_parents() {
        assert!(caption_path(Path::new("ds/masks/x.png"), "caption").is_err());
        assert!(caption_path(Path::new("ds/_mask/x.png"), "caption").is_err());
        assert!(caption_path(Path::new("x.png"), "caption").is_err());
    }

    #[test]
    fn split_names() {
        assert_eq!(split_of_mask_dir(Path::new("/a/train_mask")), Some("train"));
        assert_eq!(split_of_mask_dir(Path::new("/a/val_extra_mask")), Some("val_extra"));
        assert_eq!(split_of_mask_dir(Path::new("/a/train")), None);
    }
}
