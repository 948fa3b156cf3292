//! Composable resilience wrappers (§4.5), applied around provider calls in
//! the order Timeout ∘ CircuitBreaker ∘ Retry ∘ Provider, with an
//! independent rate limiter as the outermost layer for remote backends.

pub mod circuit_breaker;
pub mod rate_limiter;
pub mod retry;
pub mod timeout;

pub use circuit_breaker::{BreakerState, CircuitBreaker, CircuitBreakerConfig};
pub use rate_limiter::RateLimiter;
pub use retry::{Retry, RetryConfig};
pub use timeout::Timeout;
