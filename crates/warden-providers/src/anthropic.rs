//! Cloud provider A: an Anthropic-compatible messages backend. System
//! prompt is sent out-of-band as a top-level field rather than a message
//! (§4.4). Grounded on the `"anthropic"` arm of
//! `llmspell-providers::rig::RigProvider::new` (base URL + version header
//! convention), translated over `reqwest`.

use crate::provider::Provider;
use crate::types::{CompletionRequest, CompletionResponse, FinishReason, ProviderError, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    api_version: String,
    models: Vec<String>,
}

impl AnthropicProvider {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://api.anthropic.com")
    }

    #[must_use]
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            api_version: "2023-06-01".to_string(),
            models: vec!["claude-3-opus".to_string(), "claude-3-sonnet".to_string()],
        }
    }
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

fn map_stop_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
        Some("max_tokens") => FinishReason::MaxTokens,
        Some("tool_use") => FinishReason::ToolUse,
        _ => FinishReason::Error,
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn models(&self) -> Vec<String> {
        self.models.clone()
    }

    async fn complete(
        &self,
        req: &CompletionRequest,
        _cancel: &CancellationToken,
    ) -> Result<CompletionResponse, ProviderError> {
        let messages: Vec<AnthropicMessage<'_>> = req
            .messages
            .iter()
            .map(|m| AnthropicMessage {
                role: if m.role == Role::Assistant { "assistant" } else { "user" },
                content: &m.content,
            })
            .collect();

        let body = json!({
            "model": req.model,
            "system": req.system_prompt,
            "messages": messages,
            "max_tokens": req.max_tokens.unwrap_or(1024),
            "temperature": req.temperature,
        });

        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport("anthropic", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::new("anthropic", Some(status.as_u16()), text));
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::transport("anthropic", e.to_string()))?;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let content = parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .unwrap_or_default();

        debug!(provider = "anthropic", model = %req.model, duration_ms, "completion received");

        Ok(CompletionResponse {
            content,
            tool_calls: None,
            tokens_in: parsed.usage.input_tokens,
            tokens_out: parsed.usage.output_tokens,
            duration_ms,
            model: req.model.clone(),
            finish_reason: map_stop_reason(parsed.stop_reason.as_deref()),
        })
    }
}
