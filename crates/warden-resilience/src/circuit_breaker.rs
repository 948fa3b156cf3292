//! Closed/half-open/open circuit breaker (§4.5). Grounded on
//! `llmspell-hooks::circuit_breaker::CircuitBreaker`, restated against
//! this runtime's consecutive-failure model (the teacher also tracks
//! slow-call counts; this spec only needs the failure-count trigger).

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tracing::info;
use warden_core::{Result, WardenError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub max_failures: u32,
    pub reset_timeout: Duration,
    pub half_open_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            reset_timeout: Duration::from_secs(30),
            half_open_requests: 2,
        }
    }
}

struct Inner {
    state: BreakerState,
    opened_at: Option<Instant>,
    half_open_admitted: u32,
}

pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
    consecutive_failures: AtomicU32,
    half_open_successes: AtomicU32,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                opened_at: None,
                half_open_admitted: 0,
            }),
            consecutive_failures: AtomicU32::new(0),
            half_open_successes: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }

    /// Checks admission and, for `Open`, whether `reset_timeout` has
    /// elapsed and the breaker should move to `HalfOpen`.
    fn can_execute(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::HalfOpen => {
                if inner.half_open_admitted < self.config.half_open_requests {
                    inner.half_open_admitted += 1;
                    true
                } else {
                    false
                }
            }
            BreakerState::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.config.reset_timeout {
                    inner.state = BreakerState::HalfOpen;
                    inner.half_open_admitted = 1;
                    self.half_open_successes.store(0, Ordering::SeqCst);
                    info!(breaker = %self.name, "circuit breaker half-open");
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_success(&self) {
        let state = self.inner.lock().state;
        match state {
            BreakerState::Closed => {
                self.consecutive_failures.store(0, Ordering::SeqCst);
            }
            BreakerState::HalfOpen => {
                let successes = self.half_open_successes.fetch_add(1, Ordering::SeqCst) + 1;
                if successes >= self.config.half_open_requests {
                    let mut inner = self.inner.lock();
                    inner.state = BreakerState::Closed;
                    inner.opened_at = None;
                    self.consecutive_failures.store(0, Ordering::SeqCst);
                    info!(breaker = %self.name, "circuit breaker closed");
                }
            }
            BreakerState::Open => {}
        }
    }

    fn record_failure(&self) {
        let state = self.inner.lock().state;
        match state {
            BreakerState::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= self.config.max_failures {
                    let mut inner = self.inner.lock();
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(Instant::now());
                    info!(breaker = %self.name, "circuit breaker open");
                }
            }
            BreakerState::HalfOpen => {
                let mut inner = self.inner.lock();
                inner.state = BreakerState::Open;
                inner.opened_at = Some(Instant::now());
                inner.half_open_admitted = 0;
                info!(breaker = %self.name, "circuit breaker re-opened from half-open");
            }
            BreakerState::Open => {}
        }
    }

    pub async fn call<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if !self.can_execute() {
            return Err(WardenError::CircuitOpen(self.name.clone()));
        }
        let result = fut.await;
        match &result {
            Ok(_) => self.record_success(),
            Err(_) => self.record_failure(),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(max_failures: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                max_failures,
                reset_timeout: Duration::from_millis(20),
                half_open_requests: 2,
            },
        )
    }

    #[tokio::test]
    async fn opens_after_consecutive_failures() {
        let b = breaker(2);
        let _ = b.call(async { Err::<(), _>(WardenError::Internal("x".into())) }).await;
        assert_eq!(b.state(), BreakerState::Closed);
        let _ = b.call(async { Err::<(), _>(WardenError::Internal("x".into())) }).await;
        assert_eq!(b.state(), BreakerState::Open);

        let result = b.call(async { Ok::<_, WardenError>(1) }).await;
        assert!(matches!(result, Err(WardenError::CircuitOpen(_))));
    }

    #[tokio::test]
    async fn half_open_then_closed_on_success() {
        let b = breaker(1);
        let _ = b.call(async { Err::<(), _>(WardenError::Internal("x".into())) }).await;
        assert_eq!(b.state(), BreakerState::Open);

        tokio::time::sleep(Duration::from_millis(30)).await;
        b.call(async { Ok::<_, WardenError>(1) }).await.unwrap();
        assert_eq!(b.state(), BreakerState::HalfOpen);

        b.call(async { Ok::<_, WardenError>(1) }).await.unwrap();
        assert_eq!(b.state(), BreakerState::Closed);
    }

    #[tokio::test]
    async fn half_open_failure_reopens() {
        let b = breaker(1);
        let _ = b.call(async { Err::<(), _>(WardenError::Internal("x".into())) }).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        let result = b
            .call(async { Err::<(), _>(WardenError::Internal("still broken".into())) })
            .await;
        assert!(result.is_err());
        assert_eq!(b.state(), BreakerState::Open);
    }
}
