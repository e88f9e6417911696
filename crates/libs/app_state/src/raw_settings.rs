use serde::Deserialize;
use std::path::PathBuf;

/// Settings as they appear in `config/settings.yaml` and `APP__*` env vars.
/// Every field has a default, so an empty source is valid.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RawSettings {
    /// Root folder holding the per-dataset folders.
    pub dataset_root: PathBuf,
    pub captioning: CaptioningSettings,
    pub retry: RawRetrySettings,
    pub llm: RawLlmSettings,
    pub logging: LoggingSettings,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            dataset_root: PathBuf::from("."),
            captioning: CaptioningSettings::default(),
            retry: RawRetrySettings::default(),
            llm: RawLlmSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// How mask folders are scanned and captions are produced.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CaptioningSettings {
    /// Maximum number of remote calls in flight at once.
    pub concurrency: usize,
    /// Captions longer than this are regenerated.
    pub max_caption_words: usize,
    /// Regenerate every caption, even valid ones.
    pub force_regenerate: bool,
    /// Extra requests after an empty or over-long answer before falling back
    /// to the template caption.
    pub max_rerequests: usize,
    /// Only take the first N masks of each folder. 0 = no limit.
    pub limit_per_folder: usize,
    /// Captions for `<split>_mask` go to `<split>_<caption_suffix>`.
    pub caption_suffix: String,
    /// Split names to look for, e.g. `train` pairs `train_mask` with `train`.
    pub splits: Vec<String>,
    /// Extension (without dot) of the mask files.
    pub mask_extension: String,
}

impl Default for CaptioningSettings {
    fn default() -> Self {
        Self {
            concurrency: 64,
            max_caption_words: 30,
            force_regenerate: false,
            max_rerequests: 3,
            limit_per_folder: 0,
            caption_suffix: "caption".to_string(),
            splits: vec!["train".to_string(), "test".to_string()],
            mask_extension: "png".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RawRetrySettings {
    /// Total attempts per request, including the first one.
    pub max_attempts: usize,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RawRetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay_ms: 1_000,
            max_delay_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RawLlmSettings {
    pub endpoint: String,
    /// Model name, or deployment name for Azure endpoints.
    pub model: String,
    /// Set for Azure endpoints, e.g. `2024-12-01-preview`.
    pub api_version: Option<String>,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_completion_tokens: Option<u32>,
}

impl Default for RawLlmSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            model: "gpt-5-mini".to_string(),
            api_version: None,
            api_key_env: "AZURE_API_KEY".to_string(),
            timeout_secs: 30,
            max_completion_tokens: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
