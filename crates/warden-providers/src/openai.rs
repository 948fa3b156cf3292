//! Cloud provider A: an OpenAI-compatible chat-completions backend.
//! Grounded on the rig-backed `"openai"` arm of
//! `llmspell-providers::rig::RigProvider::new` for config shape
//! (API key + model + endpoint), translated here directly over
//! `reqwest` since the exact wire format is out of scope (§4.4).

use crate::provider::Provider;
use crate::types::{CompletionRequest, CompletionResponse, FinishReason, ProviderError, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    models: Vec<String>,
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com/v1")
    }

    #[must_use]
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            models: vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()],
        }
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

fn map_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::MaxTokens,
        Some("tool_calls") => FinishReason::ToolUse,
        _ => FinishReason::Error,
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn models(&self) -> Vec<String> {
        self.models.clone()
    }

    async fn complete(
        &self,
        req: &CompletionRequest,
        _cancel: &CancellationToken,
    ) -> Result<CompletionResponse, ProviderError> {
        let mut messages: Vec<ChatMessage<'_>> = Vec::with_capacity(req.messages.len() + 1);
        if let Some(system_prompt) = &req.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system_prompt,
            });
        }
        for m in &req.messages {
            messages.push(ChatMessage {
                role: role_str(m.role),
                content: &m.content,
            });
        }

        let body = json!({
            "model": req.model,
            "messages": messages,
            "max_tokens": req.max_tokens,
            "temperature": req.temperature,
        });

        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport("openai", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::new("openai", Some(status.as_u16()), text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::transport("openai", e.to_string()))?;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::new("openai", None, "empty choices array"))?;

        debug!(provider = "openai", model = %req.model, duration_ms, "completion received");

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls: None,
            tokens_in: parsed.usage.as_ref().map_or(0, |u| u.prompt_tokens),
            tokens_out: parsed.usage.as_ref().map_or(0, |u| u.completion_tokens),
            duration_ms,
            model: req.model.clone(),
            finish_reason: map_finish_reason(choice.finish_reason.as_deref()),
        })
    }
}
