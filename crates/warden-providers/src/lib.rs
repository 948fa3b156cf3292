//! Canonical LLM completion contract, four concrete provider backends,
//! and the resilience-wrapped composition of them (§4.4, §4.5).

pub mod anthropic;
pub mod cohere;
pub mod gemini;
pub mod local;
pub mod openai;
pub mod provider;
pub mod registry;
pub mod resilient;
pub mod types;

pub use anthropic::AnthropicProvider;
pub use cohere::CohereProvider;
pub use gemini::GeminiProvider;
pub use local::OllamaProvider;
pub use openai::OpenAiProvider;
pub use provider::Provider;
pub use registry::ProviderRegistry;
pub use resilient::ResilientProvider;
pub use types::{
    CompletionRequest, CompletionResponse, FinishReason, Message, ProviderError, Role,
    ToolDefinition,
};
