//! Retry utilities for generative endpoint calls with exponential backoff.
//!
//! Retried:
//! - Timeouts and connection failures
//! - 5xx server errors
//! - 429 rate limiting and 408 request timeout
//!
//! Not retried:
//! - Other 4xx client errors (bad request, invalid key, etc.)

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use reqwest::{Response, StatusCode};
use wxcast_core::ModelConfig;

/// Default retry configuration
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 16_000;
pub const DEFAULT_JITTER_MS: u64 = 1000;

/// Retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry (doubles each attempt)
    pub initial_delay: Duration,
    /// Maximum delay between retries, before jitter
    pub max_delay: Duration,
    /// Upper bound of the random delay added to each backoff
    pub jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            DEFAULT_INITIAL_DELAY_MS,
            DEFAULT_MAX_DELAY_MS,
            DEFAULT_JITTER_MS,
        )
    }
}

impl From<&ModelConfig> for RetryConfig {
    fn from(model: &ModelConfig) -> Self {
        Self::new(
            model.max_attempts,
            model.initial_delay_ms,
            model.max_delay_ms,
            model.jitter_ms,
        )
    }
}

impl RetryConfig {
    /// At least one attempt is always made.
    pub fn new(max_attempts: u32, initial_delay_ms: u64, max_delay_ms: u64, jitter_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
            jitter: Duration::from_millis(jitter_ms),
        }
    }

    /// Backoff before retry number `retry` (0-based), without jitter
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        // Exponential backoff: initial_delay * 2^retry
        let factor = 2u64.saturating_pow(retry);
        let delay_ms = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        let capped = delay_ms.min(self.max_delay.as_millis() as u64);
        Duration::from_millis(capped)
    }

    /// Backoff plus a uniform random share of the jitter bound
    pub fn delay_with_jitter(&self, retry: u32) -> Duration {
        let base = self.delay_for_attempt(retry);
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
    }

    /// Jitter-free waits between all attempts, in order
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_attempts.saturating_sub(1))
            .map(|retry| self.delay_for_attempt(retry))
            .collect()
    }
}

/// Error classification for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    NoRetry,
}

/// Check if a reqwest error is retryable
pub fn is_retryable_error(error: &reqwest::Error) -> RetryDecision {
    if error.is_timeout() {
        tracing::debug!("Request timed out, will retry");
        return RetryDecision::Retry;
    }

    if error.is_connect() {
        tracing::debug!("Connection error, will retry");
        return RetryDecision::Retry;
    }

    if error.is_request() {
        tracing::debug!("Request error, not retryable");
        return RetryDecision::NoRetry;
    }

    if let Some(status) = error.status() {
        return is_retryable_status(status);
    }

    RetryDecision::NoRetry
}

/// Check if a status code is retryable
pub fn is_retryable_status(status: StatusCode) -> RetryDecision {
    if status.is_server_error() {
        tracing::debug!("Server error ({}), will retry", status);
        return RetryDecision::Retry;
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::debug!("Rate limited (429), will retry");
        return RetryDecision::Retry;
    }

    if status == StatusCode::REQUEST_TIMEOUT {
        tracing::debug!("Request timeout (408), will retry");
        return RetryDecision::Retry;
    }

    RetryDecision::NoRetry
}

/// What the last attempt produced and how many attempts it took.
#[derive(Debug)]
pub struct RetryOutcome {
    pub attempts: u32,
    pub result: Result<Response, reqwest::Error>,
}

/// Execute an HTTP request with retry logic.
///
/// A retryable status on the final attempt is returned as `Ok` so the caller
/// can read the body for diagnostics.
///
/// # Example
/// ```ignore
/// let outcome = with_retry(&RetryConfig::default(), || async {
///     client.post(url).json(&body).send().await
/// })
/// .await;
/// ```
pub async fn with_retry<F, Fut>(config: &RetryConfig, operation: F) -> RetryOutcome
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut attempt: u32 = 0;

    loop {
        if attempt > 0 {
            let delay = config.delay_with_jitter(attempt - 1);
            tracing::info!(
                "Retry attempt {} of {}, waiting {:?}",
                attempt + 1,
                config.max_attempts,
                delay
            );
            tokio::time::sleep(delay).await;
        }
        attempt += 1;
        let last = attempt >= config.max_attempts;

        match operation().await {
            Ok(response) => {
                let status = response.status();

                if is_retryable_status(status) == RetryDecision::Retry && !last {
                    tracing::warn!(
                        "Attempt {} of {} failed with status {}, retrying",
                        attempt,
                        config.max_attempts,
                        status
                    );
                    continue;
                }

                if attempt > 1 && status.is_success() {
                    tracing::info!("Request succeeded after {} attempts", attempt);
                }
                return RetryOutcome {
                    attempts: attempt,
                    result: Ok(response),
                };
            }
            Err(e) => {
                if is_retryable_error(&e) == RetryDecision::NoRetry {
                    tracing::debug!("Non-retryable error: {}", e);
                    return RetryOutcome {
                        attempts: attempt,
                        result: Err(e),
                    };
                }

                if last {
                    tracing::error!("All {} attempts exhausted: {}", config.max_attempts, e);
                    return RetryOutcome {
                        attempts: attempt,
                        result: Err(e),
                    };
                }

                tracing::warn!(
                    "Retryable error on attempt {} of {}: {}",
                    attempt,
                    config.max_attempts,
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.initial_delay, Duration::from_millis(1000));
        assert_eq!(config.max_delay, Duration::from_millis(16_000));
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig::new(5, 100, 5000, 0);

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = RetryConfig::new(10, 100, 1000, 0);

        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(40), Duration::from_millis(1000));
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let config = RetryConfig::new(3, 100, 5000, 50);
        for _ in 0..100 {
            let delay = config.delay_with_jitter(1);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay < Duration::from_millis(250));
        }
    }

    #[test]
    fn test_schedule_has_one_wait_between_attempts() {
        let config = RetryConfig::new(4, 10, 1000, 0);
        assert_eq!(
            config.schedule(),
            vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(40)
            ]
        );
        assert!(RetryConfig::new(0, 10, 1000, 0).schedule().is_empty());
    }

    #[test]
    fn test_from_model_config() {
        let model = ModelConfig {
            max_attempts: 3,
            jitter_ms: 0,
            ..ModelConfig::default()
        };
        let config = RetryConfig::from(&model);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.jitter, Duration::ZERO);
    }

    #[test]
    fn test_retryable_status_codes() {
        assert_eq!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR), RetryDecision::Retry);
        assert_eq!(is_retryable_status(StatusCode::BAD_GATEWAY), RetryDecision::Retry);
        assert_eq!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE), RetryDecision::Retry);
        assert_eq!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS), RetryDecision::Retry);

        assert_eq!(is_retryable_status(StatusCode::BAD_REQUEST), RetryDecision::NoRetry);
        assert_eq!(is_retryable_status(StatusCode::FORBIDDEN), RetryDecision::NoRetry);
        assert_eq!(is_retryable_status(StatusCode::NOT_FOUND), RetryDecision::NoRetry);

        assert_eq!(is_retryable_status(StatusCode::OK), RetryDecision::NoRetry);
    }
}
