//! Bounded retry with exponential backoff
//!
//! | Outcome | Action |
//! |---------|--------|
//! | Network error | Retry |
//! | HTTP 429 | Retry, honouring `Retry-After` seconds |
//! | HTTP 5xx | Retry |
//! | Anything else | Return immediately |
//!
//! When attempts run out a network error comes back as
//! [`FetchError::Exhausted`]; a 429/5xx response comes back as `Ok` so the
//! caller decides what it means.

use crate::cancel::CancelSignal;
use crate::config::RetryConfig;
use crate::http::{FetchError, FetchResponse, Fetcher};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based): `initial * 2^(attempt-1)`, capped
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_delay
            .checked_mul(1u32 << exponent)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Delay before the next attempt given the last outcome
    pub fn retry_delay(&self, response: Option<&FetchResponse>, attempt: u32) -> Duration {
        if let Some(response) = response {
            if response.status == 429 {
                if let Some(seconds) = response
                    .header("retry-after")
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .filter(|s| *s > 0)
                {
                    return Duration::from_secs(seconds).min(self.max_delay);
                }
            }
        }
        self.backoff_delay(attempt)
    }

    pub fn is_retryable(outcome: &Result<FetchResponse, FetchError>) -> bool {
        match outcome {
            Err(FetchError::Network { .. }) => true,
            Err(_) => false,
            Ok(response) => response.status == 429 || response.status >= 500,
        }
    }

    /// Fetches `url`, retrying transient failures
    ///
    /// The wait between attempts races `cancel`; a fired signal returns
    /// [`FetchError::Cancelled`] at once.
    pub async fn fetch(
        &self,
        fetcher: &dyn Fetcher,
        url: &str,
        cancel: &CancelSignal,
    ) -> Result<FetchResponse, FetchError> {
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            if attempt > 1 {
                tracing::warn!(
                    url = %url,
                    attempt,
                    max_attempts = self.max_attempts,
                    "Retrying request"
                );
            }

            let outcome = fetcher.get(url).await;

            if !Self::is_retryable(&outcome) {
                return outcome;
            }

            if attempt >= self.max_attempts {
                return match outcome {
                    Err(e) => Err(FetchError::Exhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    }),
                    Ok(response) => Ok(response),
                };
            }

            let delay = self.retry_delay(outcome.as_ref().ok(), attempt);
            tracing::info!(
                url = %url,
                delay_ms = delay.as_millis() as u64,
                reason = retry_reason(&outcome),
                "Backing off before retry"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            }

            attempt += 1;
        }
    }
}

fn retry_reason(outcome: &Result<FetchResponse, FetchError>) -> &'static str {
    match outcome {
        Err(_) => "network_error",
        Ok(response) if response.status == 429 => "rate_limited",
        Ok(response) if response.status >= 500 => "server_error",
        Ok(_) => "unknown",
    }
}
