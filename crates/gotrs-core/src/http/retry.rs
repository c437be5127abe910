//! Retry logic with exponential backoff for HTTP requests
//!
//! Attempt `n` (0-indexed) that fails transiently is followed by a delay of
//! `base_delay * 2^n` before attempt `n + 1`. There is no jitter and no cap.
//! Transient failures are rate limiting, server errors, timeouts and network
//! failures; everything else fails on the spot.

use std::future::Future;
use std::time::Duration;

use log::Level;

use super::config::{ClientConfig, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_DELAY};
use crate::error::{Error, Result};

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay unit; attempt `n` waits `base_delay * 2^n`
    pub base_delay: Duration,
    /// Level at which retry decisions are logged
    pub log_level: Level,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_RETRY_BASE_DELAY,
            log_level: Level::Debug,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with a custom retry count
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Derive the policy from client configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay,
            log_level: if config.debug { Level::Warn } else { Level::Debug },
        }
    }

    /// Set the delay unit
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Total attempts, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Backoff after a failed attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    /// Decide what follows a failed attempt
    pub fn decide(&self, attempt: u32, error: &Error) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::NoRetry;
        }
        if attempt.saturating_add(1) >= self.max_attempts() {
            return RetryDecision::NoRetry;
        }
        RetryDecision::Retry {
            delay: self.delay_for_attempt(attempt),
        }
    }
}

/// Decision on whether to retry a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the request after the specified delay
    Retry { delay: Duration },
    /// Do not retry the request
    NoRetry,
}

/// Execute an attempt function with retry logic
///
/// `attempt_fn` receives the 0-indexed attempt number. Attempts run strictly
/// one after another; dropping the returned future cancels the in-flight
/// attempt or backoff sleep.
pub async fn execute_with_retry<F, Fut, T>(policy: &RetryPolicy, mut attempt_fn: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for attempt in 0..policy.max_attempts() {
        let error = match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        match policy.decide(attempt, &error) {
            RetryDecision::Retry { delay } => {
                log::log!(
                    policy.log_level,
                    "Request failed (attempt {}), retrying in {:?}: {}",
                    attempt + 1,
                    delay,
                    error
                );
                tokio::time::sleep(delay).await;
            }
            RetryDecision::NoRetry => {
                if error.is_retryable() {
                    log::log!(
                        policy.log_level,
                        "Request failed after {} attempts, giving up: {}",
                        attempt + 1,
                        error
                    );
                }
                return Err(error);
            }
        }
    }

    Err(Error::api("Request failed after all retry attempts"))
}
