//! The `Provider` contract (§4.4). Grounded on
//! `llmspell-providers::abstraction::ProviderInstance`, narrowed to the
//! three methods the spec actually names.

use crate::types::{CompletionRequest, CompletionResponse, ProviderError};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn models(&self) -> Vec<String>;

    async fn complete(
        &self,
        req: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<CompletionResponse, ProviderError>;
}
