//! Local provider L: an Ollama-compatible backend. Not wrapped in a rate
//! limiter when composed by the registry (§4.5 — rate limiting applies to
//! remote backends only). Grounded on
//! `llmspell-providers::local::ollama_provider::OllamaProvider`
//! (base-URL-configured, no API key).

use crate::provider::Provider;
use crate::types::{CompletionRequest, CompletionResponse, FinishReason, ProviderError, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    models: Vec<String>,
}

impl OllamaProvider {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            models: vec!["llama3".to_string(), "mistral".to_string()],
        }
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new("http://localhost:11434")
    }
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: OllamaResponseMessage,
    done: bool,
    prompt_eval_count: Option<u64>,
    eval_count: Option<u64>,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn models(&self) -> Vec<String> {
        self.models.clone()
    }

    async fn complete(
        &self,
        req: &CompletionRequest,
        _cancel: &CancellationToken,
    ) -> Result<CompletionResponse, ProviderError> {
        let mut messages: Vec<OllamaMessage<'_>> = Vec::with_capacity(req.messages.len() + 1);
        if let Some(system_prompt) = &req.system_prompt {
            messages.push(OllamaMessage {
                role: "system",
                content: system_prompt,
            });
        }
        for m in &req.messages {
            messages.push(OllamaMessage {
                role: role_str(m.role),
                content: &m.content,
            });
        }

        let body = json!({
            "model": req.model,
            "messages": messages,
            "stream": false,
            "options": { "temperature": req.temperature },
        });

        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport("local", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::new("local", Some(status.as_u16()), text));
        }

        let parsed: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::transport("local", e.to_string()))?;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        debug!(provider = "local", model = %req.model, duration_ms, "completion received");

        Ok(CompletionResponse {
            content: parsed.message.content,
            tool_calls: None,
            tokens_in: parsed.prompt_eval_count.unwrap_or(0),
            tokens_out: parsed.eval_count.unwrap_or(0),
            duration_ms,
            model: req.model.clone(),
            finish_reason: if parsed.done { FinishReason::Stop } else { FinishReason::Error },
        })
    }
}
