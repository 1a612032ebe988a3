//! Retry with backoff for page fetches
//!
//! This is the only place failures are classified as retriable. By default
//! every [`FetchError`] is retried; turning off `retry_client_errors` makes
//! HTTP 4xx responses (other than 408 and 429) fail immediately.

use crate::config::{Backoff, RetryConfig};
use crate::crawler::fetcher::PageFetcher;
use crate::FetchError;
use std::future::Future;
use std::time::Duration;
use url::Url;

/// How many times to try a page and how long to wait in between
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included (at least 1)
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
    pub retry_client_errors: bool,
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self.backoff {
            Backoff::Constant => self.base_delay,
            Backoff::Linear => self.base_delay.saturating_mul(attempt),
            Backoff::Exponential => {
                let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
        }
    }

    /// Whether a failed attempt may be followed by another one
    ///
    /// Decode failures are deterministic for a given body and never retried.
    pub fn is_retriable(&self, error: &FetchError) -> bool {
        match error {
            FetchError::Decode { .. } => false,
            _ => self.retry_client_errors || !error.is_client_error(),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            backoff: config.backoff,
            retry_client_errors: config.retry_client_errors,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

/// A value produced after one or more attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
}

/// The last error of an attempt sequence that never succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryFailure {
    pub error: FetchError,
    pub attempts: u32,
}

/// Runs `op` until it succeeds, fails permanently, or runs out of attempts
///
/// `op` receives the 1-based attempt number. Between failed attempts the
/// caller is suspended for `policy.delay_for(attempt)`; there is no delay
/// after the final attempt.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<Retried<T>, RetryFailure>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!("{} succeeded on attempt {}", label, attempt);
                }
                return Ok(Retried {
                    value,
                    attempts: attempt,
                });
            }
            Err(error) => {
                if attempt >= max_attempts {
                    tracing::warn!(
                        "Failed to fetch {} after {} attempts: {}",
                        label,
                        attempt,
                        error
                    );
                    return Err(RetryFailure {
                        error,
                        attempts: attempt,
                    });
                }

                if !policy.is_retriable(&error) {
                    tracing::warn!("Not retrying {}: {}", label, error);
                    return Err(RetryFailure {
                        error,
                        attempts: attempt,
                    });
                }

                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "Retrying {} (attempt {}/{}) in {:?}: {}",
                    label,
                    attempt,
                    max_attempts,
                    delay,
                    error
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Fetches and decodes a page, retrying per `policy`
pub async fn fetch_with_retry(
    fetcher: &PageFetcher,
    url: &Url,
    policy: &RetryPolicy,
) -> Result<Retried<String>, RetryFailure> {
    retry(policy, url.as_str(), move |_| fetcher.fetch_text(url)).await
}
