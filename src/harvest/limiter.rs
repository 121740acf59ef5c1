//! Global rate limiter shared by every fetch worker

use crate::config::validate_rate_limit;
use crate::ConfigError;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::Quota;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

type DirectRateLimiter = governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// No token became available before the wait deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no rate limit token available within {0:?}")]
pub struct RateLimitExceeded(pub Duration);

/// Token bucket with a sustained rate and a burst capacity
///
/// One instance is shared (behind an `Arc`) by the whole fetch pool, so the
/// ceiling applies to the pool as a whole rather than to each worker.
pub struct RateLimiter {
    inner: DirectRateLimiter,
    rate_per_second: f64,
    burst: u32,
}

impl RateLimiter {
    /// Creates a limiter allowing `rate_per_second` tokens per second on
    /// average and up to `burst` tokens at once.
    ///
    /// Fractional rates are allowed (`0.5` is one token every two seconds).
    pub fn new(rate_per_second: f64, burst: u32) -> Result<Self, ConfigError> {
        validate_rate_limit(rate_per_second, burst)?;

        let period = Duration::try_from_secs_f64(1.0 / rate_per_second).map_err(|_| {
            ConfigError::Validation(format!(
                "rate_limit_per_second {} is too small",
                rate_per_second
            ))
        })?;
        let burst_size = NonZeroU32::new(burst)
            .ok_or_else(|| ConfigError::Validation("burst_limit must be >= 1".to_string()))?;
        let quota = Quota::with_period(period)
            .ok_or_else(|| {
                ConfigError::Validation(format!(
                    "rate_limit_per_second {} is too large",
                    rate_per_second
                ))
            })?
            .allow_burst(burst_size);

        Ok(Self {
            inner: governor::RateLimiter::direct(quota),
            rate_per_second,
            burst,
        })
    }

    /// Waits for a token, giving up once `deadline` has elapsed
    pub async fn wait(&self, deadline: Duration) -> Result<(), RateLimitExceeded> {
        tokio::time::timeout(deadline, self.inner.until_ready())
            .await
            .map_err(|_| RateLimitExceeded(deadline))
    }

    pub fn rate_per_second(&self) -> f64 {
        self.rate_per_second
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("rate_per_second", &self.rate_per_second)
            .field("burst", &self.burst)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(RateLimiter::new(0.0, 1).is_err());
        assert!(RateLimiter::new(-2.0, 1).is_err());
        assert!(RateLimiter::new(1.0, 0).is_err());
        assert!(RateLimiter::new(1e-300, 1).is_err());
    }

    #[tokio::test]
    async fn test_burst_is_available_immediately() {
        let limiter = RateLimiter::new(0.01, 3).unwrap();
        for _ in 0..3 {
            limiter.wait(Duration::from_millis(50)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_wait_times_out_when_bucket_is_empty() {
        let limiter = RateLimiter::new(0.01, 1).unwrap();
        limiter.wait(Duration::from_millis(50)).await.unwrap();

        let result = limiter.wait(Duration::from_millis(50)).await;
        assert_eq!(result, Err(RateLimitExceeded(Duration::from_millis(50))));
    }

    #[tokio::test]
    async fn test_tokens_refill_over_time() {
        let limiter = RateLimiter::new(50.0, 1).unwrap();
        limiter.wait(Duration::from_millis(10)).await.unwrap();

        // One token every 20ms
        assert!(limiter.wait(Duration::from_secs(1)).await.is_ok());
    }
}
