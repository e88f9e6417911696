use crate::{CaptioningSettings, LoggingSettings, RawSettings};
use color_eyre::eyre::{Result, WrapErr, eyre};
use std::path::{PathBuf, absolute};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub dataset_root: PathBuf,
    pub captioning: CaptioningSettings,
    pub retry: RetrySettings,
    pub llm: LlmSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub endpoint: String,
    pub model: String,
    pub api_version: Option<String>,
    pub api_key_env: String,
    pub timeout: Duration,
    pub max_completion_tokens: Option<u32>,
}

impl TryFrom<RawSettings> for AppSettings {
    type Error = color_eyre::Report;

    fn try_from(raw: RawSettings) -> Result<Self> {
        let dataset_root = absolute(&raw.dataset_root)
            .wrap_err_with(|| format!("Invalid dataset_root {}", raw.dataset_root.display()))?;
        if raw.captioning.concurrency == 0 {
            return Err(eyre!("captioning.concurrency must be at least 1"));
        }
        if raw.captioning.max_caption_words == 0 {
            return Err(eyre!("captioning.max_caption_words must be at least 1"));
        }
        if raw.retry.max_attempts == 0 {
            return Err(eyre!("retry.max_attempts must be at least 1"));
        }

        Ok(Self {
            dataset_root,
            captioning: raw.captioning,
            retry: RetrySettings {
                max_attempts: raw.retry.max_attempts,
                initial_delay: Duration::from_millis(raw.retry.initial_delay_ms),
                max_delay: Duration::from_millis(raw.retry.max_delay_ms),
            },
            llm: LlmSettings {
                endpoint: raw.llm.endpoint,
                model: raw.llm.model,
                api_version: raw.llm.api_version.filter(|v| !v.is_empty()),
                api_key_env: raw.llm.api_key_env,
                timeout: Duration::from_secs(raw.llm.timeout_secs),
                max_completion_tokens: raw.llm.max_completion_tokens,
            },
            logging: raw.logging,
        })
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl LlmSettings {
    /// Reads the API key from the environment variable named by `api_key_env`.
    ///
    /// # Errors
    ///
    /// * The variable is unset or empty. Callers treat this as fatal before
    ///   any work starts.
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(eyre!(
                "Missing credential: please set the {} environment variable.",
                self.api_key_env
            )),
        }
    }
}
