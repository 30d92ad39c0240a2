//! Bounded retries for provider calls.
//!
//! The policy itself is a pure function from (attempts made, failure class)
//! to a decision, so it can be tested without any I/O. [`retry`] drives an
//! async operation with it.

use crate::error::{ReelError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    Fixed,
    #[default]
    Exponential,
}

/// Retry policy for a single logical operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff: Backoff::Exponential,
        }
    }
}

/// Outcome of consulting the policy after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    GiveUp,
}

impl RetryPolicy {
    /// A policy that retries without sleeping. Useful in tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff: Backoff::Fixed,
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Exponential => {
                let exponent = attempt.saturating_sub(1).min(16);
                self.base_delay.saturating_mul(1u32 << exponent)
            }
        };
        delay.min(self.max_delay.max(self.base_delay))
    }

    /// Decide what to do after `attempts_made` attempts, the last of which failed.
    pub fn decide(&self, attempts_made: u32, transient: bool) -> RetryDecision {
        if !transient || attempts_made >= self.max_attempts {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Retry(self.delay_for(attempts_made))
        }
    }
}

/// A failed provider call, classified for the retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub message: String,
    pub transient: bool,
}

impl ProviderFailure {
    /// Network trouble, timeouts, rate limits, 5xx.
    pub fn transient(message: impl Into<String>) -> Self {
        Self { message: message.into(), transient: true }
    }

    /// Anything retrying cannot fix (bad key, invalid request, bad payload).
    pub fn fatal(message: impl Into<String>) -> Self {
        Self { message: message.into(), transient: false }
    }

    /// Classify an HTTP status code returned by a provider.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = format!("HTTP {}: {}", status, body.trim());
        if is_transient_status(status) {
            Self::transient(message)
        } else {
            Self::fatal(message)
        }
    }

    /// Classify a transport-level reqwest error.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status, &err.to_string());
        }
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            Self::transient(err.to_string())
        } else {
            Self::fatal(err.to_string())
        }
    }
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Statuses worth another attempt.
pub fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error()
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
}

/// Run `op` until it succeeds, fails fatally, or the policy gives up.
///
/// `op` receives the 1-based attempt number. Exhaustion and fatal failures
/// both surface as [`ReelError::Provider`].
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, ProviderFailure>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation, attempt);
                }
                return Ok(value);
            }
            Err(failure) => match policy.decide(attempt, failure.transient) {
                RetryDecision::Retry(delay) => {
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        operation, attempt, policy.max_attempts, failure, delay
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                RetryDecision::GiveUp if failure.transient => {
                    return Err(ReelError::Provider(format!(
                        "{} failed after {} attempt(s): {}",
                        operation, attempt, failure
                    )));
                }
                RetryDecision::GiveUp => {
                    return Err(ReelError::Provider(format!("{} failed: {}", operation, failure)));
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_fixed_delay() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(1),
            backoff: Backoff::Fixed,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(4), Duration::from_millis(200));
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            backoff: Backoff::Exponential,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for(40), Duration::from_millis(500));
    }

    #[test]
    fn test_decide() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.decide(1, true), RetryDecision::Retry(Duration::ZERO));
        assert_eq!(policy.decide(2, true), RetryDecision::Retry(Duration::ZERO));
        assert_eq!(policy.decide(3, true), RetryDecision::GiveUp);
        assert_eq!(policy.decide(1, false), RetryDecision::GiveUp);
    }

    #[test]
    fn test_status_classification() {
        assert!(is_transient_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_transient_status(reqwest::StatusCode::BAD_GATEWAY));
        assert!(is_transient_status(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_transient_status(reqwest::StatusCode::UNAUTHORIZED));
        assert!(!is_transient_status(reqwest::StatusCode::UNPROCESSABLE_ENTITY));

        let failure = ProviderFailure::from_status(reqwest::StatusCode::UNAUTHORIZED, "bad key");
        assert!(!failure.transient);
        assert!(failure.message.contains("bad key"));
    }

    #[tokio::test]
    async fn test_succeeds_after_n_minus_one_transient_failures() {
        let policy = RetryPolicy::immediate(4);
        let calls = AtomicU32::new(0);

        let result = retry(&policy, "synthesis", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 4 {
                    Err(ProviderFailure::transient("503"))
                } else {
                    Ok("audio")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "audio");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_n_transient_failures_is_provider_error() {
        let policy = RetryPolicy::immediate(3);
        let calls = AtomicU32::new(0);

        let result: Result<()> = retry(&policy, "story generation", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderFailure::transient("connection reset")) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(ReelError::Provider(msg)) => {
                assert!(msg.contains("3 attempt"));
                assert!(msg.contains("connection reset"));
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[test]
    fn test_retry_waits_between_attempts() {
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(20),
            backoff: Backoff::Fixed,
        };
        let started = std::time::Instant::now();

        let result = tokio_test::block_on(retry(&policy, "synthesis", |attempt| async move {
            if attempt == 1 {
                Err(ProviderFailure::transient("timeout"))
            } else {
                Ok(attempt)
            }
        }));

        assert_eq!(result.unwrap(), 2);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_fatal_failure_is_not_retried() {
        let policy = RetryPolicy::immediate(5);
        let calls = AtomicU32::new(0);

        let result: Result<()> = retry(&policy, "synthesis", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderFailure::fatal("HTTP 401: invalid api key")) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ReelError::Provider(_))));
    }
}
