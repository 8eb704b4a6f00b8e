//! Retry policy for outbound webhook deliveries
//!
//! Transient failures (timeouts, connection errors, 429 and gateway errors)
//! are retried with exponential backoff: 1s, 2s, 4s, ... capped at 30s.

use std::time::Duration;

/// First backoff delay in seconds
const MIN_BACKOFF_SECS: u64 = 1;
/// Maximum backoff delay in seconds
const MAX_BACKOFF_SECS: u64 = 30;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_secs(MIN_BACKOFF_SECS),
            max_delay: Duration::from_secs(MAX_BACKOFF_SECS),
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_N8N_MAX_ATTEMPTS)
    }
}

/// Check if an HTTP status code indicates a retryable error
pub fn is_retryable_status(status: u16) -> bool {
    matches!(
        status,
        429 | // Too Many Requests
        502 | // Bad Gateway
        503 | // Service Unavailable
        504   // Gateway Timeout
    )
}

/// Helper function to check if a reqwest error is retryable
pub fn is_reqwest_error_retryable(err: &reqwest::Error) -> bool {
    err.is_timeout()
        || err.is_connect()
        || err.status().map(|s| is_retryable_status(s.as_u16())).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::new(10);

        assert_eq!(policy.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(5), Duration::from_secs(16));

        // Capped
        assert_eq!(policy.backoff_delay(6), Duration::from_secs(30));
        assert_eq!(policy.backoff_delay(40), Duration::from_secs(30));
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::new(3);
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));

        // At least one attempt is always made
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
    }

    #[test]
    fn test_is_retryable_status() {
        assert!(is_retryable_status(502));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(504));
        assert!(is_retryable_status(429));
        assert!(!is_retryable_status(500));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(401));
        assert!(!is_retryable_status(200));
    }
}
