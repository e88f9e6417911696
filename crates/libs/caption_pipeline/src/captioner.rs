use crate::prompt::CaptionPrompt;
use crate::text::simple_caption;
use language_model::{ChatClient, LlmResult};

/// Something that turns a caption prompt into raw caption text.
pub trait Captioner {
    fn caption(&self, prompt: &CaptionPrompt) -> impl Future<Output = LlmResult<String>>;
}

impl Captioner for ChatClient {
    async fn caption(&self, prompt: &CaptionPrompt) -> LlmResult<String> {
        self.call(&prompt.messages).await
    }
}

/// Offline captioner producing `"<Target> in <site> <modality>"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateCaptioner;

impl Captioner for TemplateCaptioner {
    async fn caption(&self, prompt: &CaptionPrompt) -> LlmResult<String> {
        Ok(simple_caption(&prompt.metadata))
    }
}
