//! Token bucket rate limiter for oracle request throttling.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::domain::models::RateLimitConfig;
use crate::domain::ports::Sleeper;

/// Token bucket rate limiter.
///
/// Tokens refill continuously based on elapsed time; `acquire` waits until
/// at least one token is available and then consumes it. The oracle is a
/// single shared external session, so the bucket capacity is usually 1 and
/// the refill rate well under a request per second.
#[derive(Clone)]
pub struct TokenBucketRateLimiter {
    /// Current number of available tokens.
    tokens: Arc<Mutex<f64>>,
    /// Maximum token capacity (burst tolerance).
    capacity: f64,
    /// Tokens added per second.
    refill_rate: f64,
    /// Last time tokens were refilled.
    last_refill: Arc<Mutex<Instant>>,
}

impl TokenBucketRateLimiter {
    /// Create a new rate limiter.
    ///
    /// # Arguments
    /// * `requests_per_second` - Sustained request rate (refill rate)
    /// * `burst_size` - Bucket capacity
    pub fn new(requests_per_second: f64, burst_size: u32) -> Self {
        assert!(
            requests_per_second > 0.0,
            "requests_per_second must be positive"
        );
        assert!(burst_size > 0, "burst_size must be at least 1");

        let capacity = f64::from(burst_size);
        Self {
            tokens: Arc::new(Mutex::new(capacity)),
            capacity,
            refill_rate: requests_per_second,
            last_refill: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Acquire a token, waiting through `sleeper` as needed.
    pub async fn acquire(&self, sleeper: &dyn Sleeper) {
        loop {
            let wait = {
                let mut tokens = self.tokens.lock().await;
                self.refill(&mut tokens).await;

                if *tokens >= 1.0 {
                    *tokens -= 1.0;
                    return;
                }
                // Time until one full token accumulates.
                Duration::from_secs_f64((1.0 - *tokens) / self.refill_rate)
            };
            sleeper.sleep(wait).await;
        }
    }

    /// Refill tokens according to elapsed time, capped at capacity.
    async fn refill(&self, tokens: &mut f64) {
        let mut last = self.last_refill.lock().await;
        let elapsed = last.elapsed();
        *last = Instant::now();
        *tokens = (*tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity);
    }
}

impl From<&RateLimitConfig> for TokenBucketRateLimiter {
    fn from(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_second, config.burst_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::NoopSleeper;

    #[tokio::test]
    async fn test_acquire_within_burst_is_immediate() {
        let limiter = TokenBucketRateLimiter::new(10.0, 3);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire(&NoopSleeper).await;
        }
        // All three fit in the initial burst; no real waiting happened.
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_tokens_are_consumed() {
        let limiter = TokenBucketRateLimiter::new(1000.0, 2);
        limiter.acquire(&NoopSleeper).await;
        limiter.acquire(&NoopSleeper).await;
        let tokens = *limiter.tokens.lock().await;
        assert!(tokens < 1.0);
    }

    #[tokio::test]
    async fn test_refill_caps_at_capacity() {
        let limiter = TokenBucketRateLimiter::new(1_000_000.0, 2);
        limiter.acquire(&NoopSleeper).await;
        // Sleep long enough for far more than capacity to accumulate.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let mut tokens = limiter.tokens.lock().await;
        limiter.refill(&mut tokens).await;
        assert!(*tokens <= 2.0);
    }

    #[test]
    #[should_panic(expected = "requests_per_second must be positive")]
    fn test_zero_rate_panics() {
        let _ = TokenBucketRateLimiter::new(0.0, 1);
    }
}
