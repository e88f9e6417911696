use crate::mask_name::MaskMetadata;
use language_model::Message;

const SYSTEM_PROMPT: &str = "You are a medical imaging specialist. Write varied, clear, \
unambiguous and SHORT instructions for anatomical segmentation tasks.";

/// What the captioner is asked: the parsed mask metadata plus the chat
/// messages derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionPrompt {
    pub metadata: MaskMetadata,
    pub messages: Vec<Message>,
}

impl CaptionPrompt {
    /// Builds the prompt for one mask. The task wording is one of several
    /// patterns, picked from `seed_key` so reruns ask the same question.
    #[must_use]
    pub fn for_mask(metadata: MaskMetadata, seed_key: &str, max_words: usize) -> Self {
        let patterns = task_patterns(&metadata);
        let task = &patterns[pick_index(seed_key, patterns.len())];
        let user = format!(
            "Target Structure: {target}\n\
             Imaging Context: {context} of the {site}\n\n\
             Task: {task}\n\n\
             Requirements:\n\
             - Only output the question/instruction text.\n\
             - Vary the phrasing (do not always start with 'Please').\n\
             - Professional and direct tone.\n\
             - Keep it concise (<= {max_words} words).\n",
            target = metadata.target,
            context = metadata.modality_description(),
            site = metadata.site,
        );

        Self {
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(user)],
            metadata,
        }
    }
}

fn task_patterns(meta: &MaskMetadata) -> [String; 9] {
    let target = &meta.target;
    let site = &meta.site;
    let modality = &meta.modality;
    let description = meta.modality_description();
    [
        format!("Write a question asking to identify the {target} in this {description} scan."),
        format!("Write a command to delineate the {target} on this {site} {modality} slice."),
        format!("Ask the model to find the pixels corresponding to the {target}."),
        format!("Ask where the {target} is located in this {description} image."),
        format!("Formulate a question to identify the {target} pixels within this {site} scan."),
        format!("Ask which part of this {description} corresponds to the {target}."),
        format!("Request a mask for the {target} area on this {description}."),
        format!("Direct the model to isolate the {target} from the surrounding {site} tissue."),
        format!("Request a segmentation of the {target} within this {site} region."),
    ]
}

fn pick_index(seed_key: &str, len: usize) -> usize {
    fastrand::Rng::with_seed(pattern_seed(seed_key)).usize(..len)
}

/// Stable across builds and platforms, unlike std's `DefaultHasher`.
fn pattern_seed(seed_key: &str) -> u64 {
    let digest = blake3::hash(seed_key.as_bytes());
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(seed)
}
