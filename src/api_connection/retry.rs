use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::api_connection::connection::ApiConnectionError;
use crate::error::{GeneratorError, ProviderError};

/// HTTP statuses that can never succeed on a retry.
pub const NON_RETRYABLE_STATUSES: &[u16] = &[400, 401, 403, 404];

/// Classifies whether an error is worth another attempt.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for ProviderError {
    fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network { .. } => true,
            ProviderError::Http { status, .. } => !NON_RETRYABLE_STATUSES.contains(status),
            ProviderError::Malformed { .. } | ProviderError::NotFound { .. } => false,
        }
    }
}

impl Retryable for ApiConnectionError {
    fn is_retryable(&self) -> bool {
        match self {
            ApiConnectionError::Network(_) | ApiConnectionError::EmptyResponse(_) => true,
            ApiConnectionError::Api { status, .. } => !NON_RETRYABLE_STATUSES.contains(&status.as_u16()),
            ApiConnectionError::MissingApiKey(_) | ApiConnectionError::Serialization(_) => false,
        }
    }
}

impl Retryable for GeneratorError {
    fn is_retryable(&self) -> bool {
        match self {
            GeneratorError::Api(e) => e.is_retryable(),
            GeneratorError::Parse(_) => true,
            GeneratorError::Schema(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound of the random jitter added to each delay.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// A policy that never waits, for tests and offline runs.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Exponential delay for the given retry (0-based), capped, without jitter.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let multiplier = 2u32.saturating_pow(retry.min(16));
        self.base_delay.saturating_mul(multiplier).min(self.max_delay)
    }

    fn delay_with_jitter(&self, retry: u32) -> Duration {
        let base = self.backoff_for(retry);
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return base;
        }
        let extra = rand::thread_rng().gen_range(0..=jitter_ms);
        (base + Duration::from_millis(extra)).min(self.max_delay + self.jitter)
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or the
/// policy's retries are used up. The last error is returned on exhaustion.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut operation: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut retry = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if retry < policy.max_retries && e.is_retryable() => {
                let delay = policy.delay_with_jitter(retry);
                warn!(operation = %label, error = %e, attempt = retry + 1, "Transient error, retrying in {:?}", delay);
                tokio::time::sleep(delay).await;
                retry += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn http_error(status: u16) -> ProviderError {
        ProviderError::Http { provider: "test".to_string(), status, body: String::new() }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            jitter: Duration::ZERO,
        };
        assert_eq!(policy.backoff_for(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(400));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(30), Duration::from_millis(500));
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        for status in [400, 401, 403, 404] {
            assert!(!http_error(status).is_retryable());
        }
        assert!(http_error(429).is_retryable());
        assert!(http_error(503).is_retryable());
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, ProviderError> = retry_with_backoff(&RetryPolicy::immediate(3), "flaky", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err(http_error(503)) } else { Ok(n) } }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), ProviderError> = retry_with_backoff(&RetryPolicy::immediate(5), "auth", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(http_error(401)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), ProviderError> = retry_with_backoff(&RetryPolicy::immediate(2), "down", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ProviderError::Network { provider: "test".to_string(), message: "refused".to_string() })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
