//! Agent configuration (§4.3): provider name, model, system prompt,
//! tools, max tokens, temperature, capabilities. Grounded on the shape of
//! `llmspell-agents::factory::AgentConfig`/`ModelConfig`, flattened since
//! this runtime has one agent kind (provider-backed LLM agent), not the
//! teacher's pluggable `agent_type` taxonomy.

use serde::{Deserialize, Serialize};
use warden_core::AgentId;
use warden_providers::ToolDefinition;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: AgentId,
    pub name: String,
    pub provider: String,
    pub model: String,
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl AgentConfig {
    #[must_use]
    pub fn new(name: impl Into<String>, provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: AgentId::new(),
            name: name.into(),
            provider: provider.into(),
            model: model.into(),
            system_prompt: None,
            tools: Vec::new(),
            max_tokens: None,
            temperature: None,
            capabilities: Vec::new(),
        }
    }
}
