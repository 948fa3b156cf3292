//! The handler contract, grounded on the sync/async handler split in
//! `llmspell-events::handler` — collapsed to one async trait since the
//! bus (not the handler) decides whether a given `Publish` call is
//! dispatched inline or detached (§4.8).

use crate::event::Event;
use async_trait::async_trait;
use warden_core::Result;

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &Event) -> Result<()>;

    fn name(&self) -> &str {
        "anonymous_handler"
    }
}

/// Wraps a closure returning a boxed future as an [`EventHandler`].
pub struct FnHandler<F> {
    name: String,
    handler: F,
}

impl<F, Fut> FnHandler<F>
where
    F: Fn(&Event) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<()>> + Send,
{
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(&Event) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<()>> + Send,
{
    async fn handle(&self, event: &Event) -> Result<()> {
        (self.handler)(event).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
