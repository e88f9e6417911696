use crate::error::ItemError;
use crate::mask_name::{MaskMetadata, caption_path};
use crate::prompt::CaptionPrompt;
use app_state::CaptioningSettings;
use std::path::{Path, PathBuf};

/// One mask to caption: where it is, where its caption goes, and what to ask.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub mask_path: PathBuf,
    pub output_path: PathBuf,
    pub prompt: CaptionPrompt,
}

impl WorkItem {
    /// # Errors
    ///
    /// * The caption path cannot be derived from the mask path.
    pub fn from_mask(mask_path: &Path, settings: &CaptioningSettings) -> Result<Self, ItemError> {
        let output_path = caption_path(mask_path, &settings.caption_suffix)?;
        let stem = mask_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let prompt = CaptionPrompt::for_mask(
            MaskMetadata::from_stem(&stem),
            &stem,
            settings.max_caption_words,
        );
        Ok(Self {
            mask_path: mask_path.to_path_buf(),
            output_path,
            prompt,
        })
    }
}
