use app_state::RetrySettings;
use std::time::Duration;
use tokio_retry::RetryIf;

/// Exponential backoff for remote calls. `max_attempts` counts the first try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_delay: settings.initial_delay,
            max_delay: settings.max_delay,
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// The waits between attempts, one fewer than `max_attempts`.
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        Backoff {
            next: self.initial_delay.min(self.max_delay),
            max_delay: self.max_delay,
            multiplier: self.multiplier,
            remaining: self.max_attempts.saturating_sub(1),
        }
    }

    /// Attempts still allowed after `failures` failed ones.
    #[must_use]
    pub fn attempts_left(&self, failures: usize) -> usize {
        self.max_attempts.saturating_sub(failures)
    }

    /// Runs `action` until it succeeds, fails with an error `is_retryable`
    /// rejects, or the attempts run out. The last error is returned.
    pub async fn retry<T, E, A, Fut, P>(&self, action: A, is_retryable: P) -> Result<T, E>
    where
        A: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: FnMut(&E) -> bool,
    {
        RetryIf::spawn(self.backoff(), action, is_retryable).await
    }
}

#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max_delay: Duration,
    multiplier: u32,
    remaining: usize,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.next;
        self.next = current.saturating_mul(self.multiplier).min(self.max_delay);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use language_model::{LlmError, StatusCode};
    use std::cell::RefCell;
    use tokio::time::Instant;

    fn unavailable() -> LlmError {
        LlmError::Api {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: "busy".to_string(),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 6,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            multiplier: 2,
        };
        let delays: Vec<u64> = policy.backoff().map(|d| d.as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 5, 5]);
    }

    #[test]
    fn single_attempt_has_no_delays() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff().count(), 0);
    }

    #[test]
    fn last_failure_leaves_no_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };

        let left: Vec<usize> = (1..=4).map(|f| policy.attempts_left(f)).collect();

        // Only the first two failures are followed by a backoff.
        assert_eq!(left, vec![2, 1, 0, 0]);
        assert_eq!(policy.backoff().count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_with_growing_gaps() {
        // ARRANGE
        let policy = RetryPolicy::default();
        let attempts = RefCell::new(Vec::new());
        let failures = 3;

        // ACT
        let result = policy
            .retry(
                || {
                    attempts.borrow_mut().push(Instant::now());
                    let n = attempts.borrow().len();
                    async move {
                        if n <= failures {
                            Err(unavailable())
                        } else {
                            Ok(n)
                        }
                    }
                },
                LlmError::is_retryable,
            )
            .await;

        // ASSERT
        assert_eq!(result.ok(), Some(failures + 1));
        let attempts = attempts.into_inner();
        assert_eq!(attempts.len(), failures + 1);
        let gaps: Vec<Duration> = attempts.windows(2).map(|w| w[1] - w[0]).collect();
        assert!(gaps.windows(2).all(|g| g[0] <= g[1]), "gaps {gaps:?}");
        assert!(gaps[0] >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_is_not_retried() {
        let policy = RetryPolicy::default();
        let calls = RefCell::new(0);

        let result: Result<(), LlmError> = policy
            .retry(
                || {
                    *calls.borrow_mut() += 1;
                    async {
                        Err(LlmError::Api {
                            status: StatusCode::BAD_REQUEST,
                            body: "bad".to_string(),
                        })
                    }
                },
                LlmError::is_retryable,
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.into_inner(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: 4,
            ..RetryPolicy::default()
        };
        let calls = RefCell::new(0);

        let result: Result<(), LlmError> = policy
            .retry(
                || {
                    *calls.borrow_mut() += 1;
                    async { Err(unavailable()) }
                },
                LlmError::is_retryable,
            )
            .await;

        assert!(matches!(result, Err(LlmError::Api { status, .. }) if status == StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(calls.into_inner(), 4);
    }
}
