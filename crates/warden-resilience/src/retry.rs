//! Exponential backoff retry with jitter (§4.5). Grounded on the
//! backoff/jitter strategy shape of `llmspell-hooks::builtin::retry`,
//! narrowed to the spec's single `InitialDelay · Multiplier^(attempt-1)`
//! formula, clamped to `max_delay`.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use warden_core::{Result, WardenError};

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.multiplier.powi((attempt - 1) as i32);
        let scaled = self.initial_delay.mul_f64(exp).min(self.max_delay);
        let jitter_ms = rand::thread_rng().gen_range(0..=scaled.as_millis().max(1) as u64 / 4);
        scaled + Duration::from_millis(jitter_ms)
    }
}

pub struct Retry {
    config: RetryConfig,
}

impl Retry {
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Calls `op` up to `max_attempts` times. Retries iff the error is
    /// `is_transient()`; a cancelled token aborts immediately without a
    /// further attempt.
    pub async fn call<F, Fut, T>(&self, cancel: &CancellationToken, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(WardenError::Cancelled);
            }
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.config.max_attempts && err.is_transient() => {
                    let delay = self.config.delay_for(attempt);
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = cancel.cancelled() => return Err(WardenError::Cancelled),
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
