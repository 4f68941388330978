use anyhow::{Result, anyhow};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
const EXPONENTIAL_BACKOFF_BASE: u32 = 2;

/// Decides whether a failed request is worth another attempt
pub type RetryPredicate = fn(&ureq::Error) -> bool;

/// Bounded retries with exponential backoff for blocking HTTP calls
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub retryable: RetryPredicate,
}

impl Default for RetryPolicy {
    #[inline]
    fn default() -> Self {
        Self::new(
            DEFAULT_RETRY_ATTEMPTS,
            Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        )
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; zero is treated as one
    #[inline]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            retryable: is_transient,
        }
    }

    #[inline]
    pub fn with_predicate(mut self, retryable: RetryPredicate) -> Self {
        self.retryable = retryable;
        self
    }

    /// Wait after the given (1-based) failed attempt
    #[inline]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = EXPONENTIAL_BACKOFF_BASE.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Run `request_fn` until it succeeds, fails with a non-retryable error,
    /// or the attempts are used up
    #[inline]
    pub fn run<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.max_attempts);

            match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(error) => {
                    if !(self.retryable)(&error) {
                        warn!("Non-retryable error: {}", error);
                        return Err(match error {
                            ureq::Error::StatusCode(status) if (400..500).contains(&status) => {
                                anyhow!("Client error: HTTP {}", status)
                            }
                            ureq::Error::StatusCode(status) if status >= 500 => {
                                anyhow!("Server error: HTTP {}", status)
                            }
                            ureq::Error::StatusCode(status) => {
                                anyhow!("Non-retryable HTTP status {}", status)
                            }
                            other => anyhow!("Non-retryable error: {}", other),
                        });
                    }

                    warn!(
                        "Request error: {}, attempt {}/{}",
                        error, attempt, self.max_attempts
                    );
                    last_error = Some(error);

                    if attempt < self.max_attempts {
                        let delay = self.delay_for(attempt);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        Err(match last_error {
            Some(error) => anyhow!(
                "Request failed after {} attempt(s): {}",
                self.max_attempts,
                error
            ),
            None => anyhow!("Request was never attempted"),
        })
    }
}

/// Server errors and transport failures retry; client errors do not
#[inline]
pub fn is_transient(error: &ureq::Error) -> bool {
    match error {
        ureq::Error::StatusCode(status) => *status >= 500,
        ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound
        | ureq::Error::Timeout(_)
        | ureq::Error::Io(_) => true,
        _ => false,
    }
}
