//! Cloud provider G: a Cohere-compatible chat backend. Grounded on the
//! `"cohere"` arm of `llmspell-providers::rig::RigProvider::new`.

use crate::provider::Provider;
use crate::types::{CompletionRequest, CompletionResponse, FinishReason, ProviderError, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct CohereProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    models: Vec<String>,
}

impl CohereProvider {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://api.cohere.ai")
    }

    #[must_use]
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            models: vec!["command-r-plus".to_string()],
        }
    }
}

#[derive(Serialize)]
struct ChatHistoryEntry<'a> {
    role: &'a str,
    message: &'a str,
}

#[derive(Deserialize)]
struct CohereResponse {
    text: String,
    finish_reason: Option<String>,
    meta: Option<CohereMeta>,
}

#[derive(Deserialize)]
struct CohereMeta {
    billed_units: Option<BilledUnits>,
}

#[derive(Deserialize)]
struct BilledUnits {
    input_tokens: Option<f64>,
    output_tokens: Option<f64>,
}

fn map_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("COMPLETE") => FinishReason::Stop,
        Some("MAX_TOKENS") => FinishReason::MaxTokens,
        Some("TOOL_CALL") => FinishReason::ToolUse,
        _ => FinishReason::Error,
    }
}

#[async_trait]
impl Provider for CohereProvider {
    fn name(&self) -> &str {
        "cohere"
    }

    fn models(&self) -> Vec<String> {
        self.models.clone()
    }

    async fn complete(
        &self,
        req: &CompletionRequest,
        _cancel: &CancellationToken,
    ) -> Result<CompletionResponse, ProviderError> {
        let (last, history) = req
            .messages
            .split_last()
            .ok_or_else(|| ProviderError::new("cohere", None, "at least one message is required"))?;

        let chat_history: Vec<ChatHistoryEntry<'_>> = history
            .iter()
            .map(|m| ChatHistoryEntry {
                role: if m.role == Role::Assistant { "CHATBOT" } else { "USER" },
                message: &m.content,
            })
            .collect();

        let body = json!({
            "model": req.model,
            "message": last.content,
            "chat_history": chat_history,
            "preamble": req.system_prompt,
            "max_tokens": req.max_tokens,
            "temperature": req.temperature,
        });

        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/v1/chat", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport("cohere", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::new("cohere", Some(status.as_u16()), text));
        }

        let parsed: CohereResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::transport("cohere", e.to_string()))?;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (tokens_in, tokens_out) = parsed
            .meta
            .and_then(|m| m.billed_units)
            .map_or((0, 0), |b| {
                (b.input_tokens.unwrap_or(0.0) as u64, b.output_tokens.unwrap_or(0.0) as u64)
            });

        debug!(provider = "cohere", model = %req.model, duration_ms, "completion received");

        Ok(CompletionResponse {
            content: parsed.text,
            tool_calls: None,
            tokens_in,
            tokens_out,
            duration_ms,
            model: req.model.clone(),
            finish_reason: map_finish_reason(parsed.finish_reason.as_deref()),
        })
    }
}
