//! Write-rare provider registry: readers do not take exclusive locks (§5).
//! Grounded on the name-keyed manager pattern of
//! `llmspell-providers::abstraction` combined with `parking_lot::RwLock`
//! as used throughout the teacher's registries.

use crate::provider::Provider;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use warden_core::{Result, WardenError};

#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, provider: Arc<dyn Provider>) {
        self.providers.write().insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>> {
        self.providers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| WardenError::LlmProviderNotFound(name.to_string()))
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.providers.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompletionRequest, CompletionResponse, FinishReason, ProviderError};
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct StubProvider(&'static str);

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &str {
            self.0
        }
        fn models(&self) -> Vec<String> {
            vec!["stub-model".to_string()]
        }
        async fn complete(
            &self,
            req: &CompletionRequest,
            _cancel: &CancellationToken,
        ) -> Result<CompletionResponse, ProviderError> {
            Ok(CompletionResponse {
                content: "ok".into(),
                tool_calls: None,
                tokens_in: 1,
                tokens_out: 1,
                duration_ms: 0,
                model: req.model.clone(),
                finish_reason: FinishReason::Stop,
            })
        }
    }

    #[test]
    fn register_then_get_round_trips() {
        let registry = ProviderRegistry::new();
        registry.register(Arc::new(StubProvider("stub")));
        assert!(registry.get("stub").is_ok());
    }

    #[test]
    fn missing_provider_is_not_found() {
        let registry = ProviderRegistry::new();
        assert!(matches!(
            registry.get("missing"),
            Err(WardenError::LlmProviderNotFound(_))
        ));
    }
}
