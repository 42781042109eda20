//! Retry policy for external translation calls.
//!
//! The delay schedule is a pure function of the attempt number and the last
//! error, so it can be tested without sleeping or mocking a clock.

use std::time::Duration;

use crate::config::TranslatorConfig;
use crate::error::Error;

/// Backoff schedule for the translation client.
///
/// Regular failures wait `base_delay * 2^(attempt-1)` before attempt
/// `attempt + 1`. Rate-limited failures honor the server's `retry-after`
/// when present, otherwise use a tripled exponential delay; either way the
/// wait is capped at `rate_limit_cap`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per chunk, including the first
    pub max_attempts: u32,
    /// Base delay for exponential backoff
    pub base_delay: Duration,
    /// Ceiling for rate-limit waits
    pub rate_limit_cap: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_delay: Duration, rate_limit_cap: Duration) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            base_delay,
            rate_limit_cap,
        }
    }

    pub fn from_config(config: &TranslatorConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.rate_limit_cap_ms),
        )
    }

    /// Whether an error should be treated as a rate-limit response.
    pub const fn is_rate_limited(error: &Error) -> bool {
        matches!(error, Error::TranslationRateLimited { .. })
    }

    /// Delay to sleep after failed attempt number `attempt` (1-based),
    /// before the next attempt. Callers stop retrying once `attempt`
    /// reaches `max_attempts`, so this is only meaningful below it.
    pub fn delay_after(&self, attempt: u32, error: &Error) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));

        match error {
            Error::TranslationRateLimited { retry_after } => {
                let wait = retry_after
                    .map_or_else(|| exponential.saturating_mul(3), Duration::from_secs);
                wait.min(self.rate_limit_cap)
            }
            _ => exponential,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&TranslatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(5, Duration::from_secs(1), Duration::from_secs(30))
    }

    #[test]
    fn test_exponential_backoff_sequence() {
        let policy = policy();
        let err = Error::TranslationRequest("boom".to_string());

        assert_eq!(policy.delay_after(1, &err), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2, &err), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3, &err), Duration::from_secs(4));
        assert_eq!(policy.delay_after(4, &err), Duration::from_secs(8));
    }

    #[test]
    fn test_rate_limit_uses_retry_after() {
        let policy = policy();
        let err = Error::TranslationRateLimited {
            retry_after: Some(7),
        };
        assert_eq!(policy.delay_after(1, &err), Duration::from_secs(7));
    }

    #[test]
    fn test_rate_limit_without_retry_after_triples_backoff() {
        let policy = policy();
        let err = Error::TranslationRateLimited { retry_after: None };
        assert_eq!(policy.delay_after(1, &err), Duration::from_secs(3));
        assert_eq!(policy.delay_after(2, &err), Duration::from_secs(6));
    }

    #[test]
    fn test_rate_limit_wait_is_capped() {
        let policy = policy();
        let err = Error::TranslationRateLimited {
            retry_after: Some(600),
        };
        assert_eq!(policy.delay_after(1, &err), Duration::from_secs(30));

        let err = Error::TranslationRateLimited { retry_after: None };
        assert_eq!(policy.delay_after(4, &err), Duration::from_secs(24));
        assert_eq!(policy.delay_after(5, &err), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1), Duration::from_secs(30));
        assert_eq!(policy.max_attempts, 1);
    }

    #[test]
    fn test_rate_limit_predicate() {
        assert!(RetryPolicy::is_rate_limited(
            &Error::TranslationRateLimited { retry_after: None }
        ));
        assert!(!RetryPolicy::is_rate_limited(&Error::TranslationTimeout));
    }
}
