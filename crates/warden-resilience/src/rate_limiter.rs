//! Token-bucket rate limiter (§4.5), applied as the outermost layer for
//! remote providers only. Grounded on the lazy-refill-on-access shape of
//! `llmspell-hooks::rate_limiter::token_bucket::TokenBucket`, narrowed to
//! the spec's single bucket (no burst/refill split).

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use warden_core::{Result, WardenError};

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(burst_size: u32, requests_per_minute: u32) -> Self {
        Self {
            capacity: f64::from(burst_size),
            refill_per_sec: f64::from(requests_per_minute) / 60.0,
            bucket: Mutex::new(Bucket {
                tokens: f64::from(burst_size),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Refills on demand, deducts one token when available, otherwise
    /// computes a single wake-up delay and rechecks. The bucket mutex is
    /// held only across the arithmetic, never across the sleep (§4.5, §5).
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                return Err(WardenError::Cancelled);
            }

            let wait_for = {
                let mut bucket = self.bucket.lock();
                let now = Instant::now();
                let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
                bucket.last_refill = now;

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    None
                } else {
                    let deficit = 1.0 - bucket.tokens;
                    Some(Duration::from_secs_f64(deficit / self.refill_per_sec))
                }
            };

            match wait_for {
                None => return Ok(()),
                Some(delay) => {
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = cancel.cancelled() => return Err(WardenError::Cancelled),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_is_consumed_immediately_then_throttles() {
        let limiter = RateLimiter::new(2, 600); // 10 tokens/sec refill
        let cancel = CancellationToken::new();

        let start = Instant::now();
        limiter.wait(&cancel).await.unwrap();
        limiter.wait(&cancel).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(20));

        limiter.wait(&cancel).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn cancellation_short_circuits_the_wait() {
        let limiter = RateLimiter::new(0, 1); // effectively empty, slow refill
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = limiter.wait(&cancel).await;
        assert!(matches!(result, Err(WardenError::Cancelled)));
    }
}
