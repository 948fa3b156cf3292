//! Binds an [`AgentConfig`] to a provider resolved from the provider
//! registry by provider name, constructs the request, and logs
//! structured entries before and after (§4.3). Grounded on the
//! resolve-then-delegate shape of `llmspell-agents::factory` combined
//! with the pre/post `info!` logging style of
//! `llmspell-providers::local::ollama_provider::OllamaProvider`.

use crate::config::AgentConfig;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;
use warden_core::{Result, WardenError};
use warden_providers::{CompletionRequest, CompletionResponse, Message, ProviderError, ProviderRegistry};

pub struct AgentRunner {
    providers: Arc<ProviderRegistry>,
}

impl AgentRunner {
    #[must_use]
    pub fn new(providers: Arc<ProviderRegistry>) -> Self {
        Self { providers }
    }

    pub async fn execute(
        &self,
        agent: &AgentConfig,
        messages: Vec<Message>,
        cancel: &CancellationToken,
    ) -> Result<CompletionResponse> {
        let provider = self.providers.get(&agent.provider)?;

        let request = CompletionRequest {
            model: agent.model.clone(),
            system_prompt: agent.system_prompt.clone(),
            messages,
            tools: agent.tools.clone(),
            max_tokens: agent.max_tokens,
            temperature: agent.temperature,
        };

        info!(
            agent = %agent.name,
            provider = %agent.provider,
            model = %agent.model,
            "invoking agent"
        );

        let start = Instant::now();
        let response = provider
            .complete(&request, cancel)
            .await
            .map_err(|e| map_provider_error(&agent.name, e))?;

        info!(
            agent = %agent.name,
            tokens_in = response.tokens_in,
            tokens_out = response.tokens_out,
            duration_ms = response.duration_ms,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "agent completed"
        );

        Ok(response)
    }
}

fn map_provider_error(agent_name: &str, err: ProviderError) -> WardenError {
    match err.status {
        Some(429) => WardenError::LlmRateLimited(err.to_string()),
        Some(413) => WardenError::LlmContextTooLong(err.to_string()),
        _ if err.retryable => WardenError::AgentUnavailable(format!("{agent_name}: {err}")),
        _ => WardenError::AgentUnavailable(format!("{agent_name}: {err} (non-retryable)")),
    }
}
