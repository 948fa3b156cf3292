//! Wraps any [`Provider`] with the Timeout ∘ CircuitBreaker ∘ Retry ∘
//! Provider stack — timeout bounds the whole retried call, the breaker
//! wraps the retry loop so it trips on logical failures rather than
//! individual attempts, and retry sits innermost, just above the provider —
//! plus an optional outermost rate limiter for remote backends (§4.5).

use crate::provider::Provider;
use crate::types::{CompletionRequest, CompletionResponse, ProviderError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use warden_core::WardenError;
use warden_resilience::{CircuitBreaker, RateLimiter, Retry, Timeout};

pub struct ResilientProvider {
    inner: Arc<dyn Provider>,
    timeout: Timeout,
    breaker: CircuitBreaker,
    retry: Retry,
    rate_limiter: Option<RateLimiter>,
}

impl ResilientProvider {
    #[must_use]
    pub fn new(
        inner: Arc<dyn Provider>,
        timeout: Timeout,
        breaker: CircuitBreaker,
        retry: Retry,
        rate_limiter: Option<RateLimiter>,
    ) -> Self {
        Self {
            inner,
            timeout,
            breaker,
            retry,
            rate_limiter,
        }
    }
}

fn provider_err_to_warden(err: ProviderError) -> WardenError {
    if err.retryable {
        if err.status == Some(429) {
            WardenError::LlmRateLimited(err.to_string())
        } else {
            WardenError::AgentUnavailable(err.to_string())
        }
    } else {
        WardenError::Internal(err.to_string())
    }
}

fn warden_err_to_provider(provider: &str, err: WardenError) -> ProviderError {
    match err {
        WardenError::StepTimeout(msg) => ProviderError::new(provider, None, msg),
        WardenError::CircuitOpen(msg) => ProviderError::new(provider, None, msg),
        WardenError::Cancelled => ProviderError::new(provider, None, "request cancelled"),
        other => ProviderError::new(provider, None, other.to_string()),
    }
}

#[async_trait]
impl Provider for ResilientProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn models(&self) -> Vec<String> {
        self.inner.models()
    }

    async fn complete(
        &self,
        req: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<CompletionResponse, ProviderError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter
                .wait(cancel)
                .await
                .map_err(|_| ProviderError::new(self.inner.name(), None, "cancelled while rate-limited"))?;
        }

        let outcome: warden_core::Result<CompletionResponse> = self
            .timeout
            .call(async {
                self.breaker
                    .call(async {
                        self.retry
                            .call(cancel, |_attempt| async {
                                self.inner
                                    .complete(req, cancel)
                                    .await
                                    .map_err(provider_err_to_warden)
                            })
                            .await
                    })
                    .await
            })
            .await;

        outcome.map_err(|e| warden_err_to_provider(self.inner.name(), e))
    }
}
