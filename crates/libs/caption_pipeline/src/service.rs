use crate::captioner::Captioner;
use crate::error::ItemError;
use crate::gate::ConcurrencyGate;
use crate::prompt::CaptionPrompt;
use crate::retry::RetryPolicy;
use crate::text::{fallback_caption, validate_caption};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub text: String,
    /// Built from the mask name because the model gave no usable answer.
    pub fallback: bool,
}

/// Wraps a [`Captioner`] with retries, the concurrency gate and caption
/// validation.
#[derive(Debug)]
pub struct CaptionService<C> {
    captioner: C,
    retry: RetryPolicy,
    max_words: usize,
    max_rerequests: usize,
}

impl<C: Captioner> CaptionService<C> {
    pub fn new(captioner: C, retry: RetryPolicy, max_words: usize, max_rerequests: usize) -> Self {
        Self {
            captioner,
            retry,
            max_words,
            max_rerequests,
        }
    }

    pub fn captioner(&self) -> &C {
        &self.captioner
    }

    /// One logical request: retried on transient failures, each attempt
    /// holding a gate permit only while the call is in flight.
    ///
    /// # Errors
    ///
    /// * A permanent remote failure, or the last transient one once attempts run out.
    /// * [`ItemError::Cancelled`] when cancellation arrives before an attempt starts.
    pub async fn request(
        &self,
        prompt: &CaptionPrompt,
        gate: &ConcurrencyGate,
    ) -> Result<String, ItemError> {
        let mut failures = 0;
        self.retry
            .retry(
                move || async move {
                    let _permit = gate.acquire().await?;
                    let text = self.captioner.caption(prompt).await?;
                    Ok::<_, ItemError>(text.trim().to_string())
                },
                |e: &ItemError| {
                    failures += 1;
                    let retryable = e.is_retryable();
                    if retryable {
                        match self.retry.attempts_left(failures) {
                            0 => warn!("Giving up after {failures} attempts: {e}"),
                            left => warn!(
                                "Transient captioning error, backing off ({left} attempts left): {e}"
                            ),
                        }
                    }
                    retryable
                },
            )
            .await
    }

    /// Requests a caption, asks again while the answer is empty or too long,
    /// and falls back to a template caption after `max_rerequests` extra tries.
    ///
    /// # Errors
    ///
    /// * See [`Self::request`]. Invalid answers never produce an error.
    pub async fn caption(
        &self,
        prompt: &CaptionPrompt,
        gate: &ConcurrencyGate,
    ) -> Result<Caption, ItemError> {
        for attempt in 0..=self.max_rerequests {
            let text = self.request(prompt, gate).await?;
            match validate_caption(&text, self.max_words) {
                Ok(()) => {
                    return Ok(Caption {
                        text,
                        fallback: false,
                    });
                }
                Err(problem) => debug!("Rejected caption (try {}): {problem}", attempt + 1),
            }
        }

        let text = fallback_caption(&prompt.metadata, self.max_words);
        warn!("Using fallback caption \"{text}\"");
        Ok(Caption {
            text,
            fallback: true,
        })
    }
}
