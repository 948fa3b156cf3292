//! Cloud provider G: a Gemini-compatible `generateContent` backend. The API
//! key is passed as a query parameter rather than a header, and the system
//! prompt travels as `systemInstruction` (§4.4). Grounded on the
//! `"cohere"` arm of `llmspell-providers::rig::RigProvider::new`, restated
//! against Gemini's own request/response shape.

use crate::provider::Provider;
use crate::types::{CompletionRequest, CompletionResponse, FinishReason, ProviderError, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    models: Vec<String>,
}

impl GeminiProvider {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://generativelanguage.googleapis.com")
    }

    #[must_use]
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            models: vec!["gemini-1.5-pro".to_string(), "gemini-1.5-flash".to_string()],
        }
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u64>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u64>,
}

fn map_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("STOP") => FinishReason::Stop,
        Some("MAX_TOKENS") => FinishReason::MaxTokens,
        _ => FinishReason::Error,
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn models(&self) -> Vec<String> {
        self.models.clone()
    }

    async fn complete(
        &self,
        req: &CompletionRequest,
        _cancel: &CancellationToken,
    ) -> Result<CompletionResponse, ProviderError> {
        let contents: Vec<Content<'_>> = req
            .messages
            .iter()
            .map(|m| Content {
                role: if m.role == Role::Assistant { "model" } else { "user" },
                parts: vec![Part { text: &m.content }],
            })
            .collect();

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": req.max_tokens,
                "temperature": req.temperature,
            },
        });
        if let Some(system_prompt) = &req.system_prompt {
            body["systemInstruction"] = json!({ "parts": [{ "text": system_prompt }] });
        }

        let start = Instant::now();
        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, req.model
            ))
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport("gemini", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::new("gemini", Some(status.as_u16()), text));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::transport("gemini", e.to_string()))?;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::new("gemini", None, "no candidates returned"))?;

        let content = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let (tokens_in, tokens_out) = parsed
            .usage_metadata
            .map_or((0, 0), |u| (u.prompt_token_count.unwrap_or(0), u.candidates_token_count.unwrap_or(0)));

        debug!(provider = "gemini", model = %req.model, duration_ms, "completion received");

        Ok(CompletionResponse {
            content,
            tool_calls: None,
            tokens_in,
            tokens_out,
            duration_ms,
            model: req.model.clone(),
            finish_reason: map_finish_reason(candidate.finish_reason.as_deref()),
        })
    }
}
