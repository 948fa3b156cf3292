//! The in-process pub/sub bus (§4.8). Grounded on the subscription-map
//! shape of `llmspell-events::bus::EventBus`, simplified to the
//! two-dispatch-mode contract the spec actually asks for (no flow
//! control, persistence, or broadcast channel).

use crate::event::Event;
use crate::handler::EventHandler;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, warn};
use warden_core::{Result, WardenError};

const WILDCARD: &str = "*";

#[derive(Default)]
struct Subscriptions {
    by_type: HashMap<String, Vec<Arc<dyn EventHandler>>>,
    wildcard: Vec<Arc<dyn EventHandler>>,
}

/// In-process event bus. One mutex guards the subscription map; it is
/// always released before a handler is invoked (§5 shared-resource policy).
pub struct EventBus {
    subscriptions: Mutex<Subscriptions>,
    default_async: AtomicBool,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(Subscriptions::default()),
            default_async: AtomicBool::new(false),
        }
    }

    /// An event bus whose `publish` dispatches asynchronously by default,
    /// equivalent to every call going through `publish_async` (§4.8).
    #[must_use]
    pub fn with_default_async(default_async: bool) -> Self {
        let bus = Self::new();
        bus.default_async.store(default_async, Ordering::SeqCst);
        bus
    }

    pub fn subscribe(&self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) {
        let event_type = event_type.into();
        assert_ne!(event_type, WILDCARD, "use subscribe_all for '*'");
        self.subscriptions
            .lock()
            .by_type
            .entry(event_type)
            .or_default()
            .push(handler);
    }

    pub fn subscribe_all(&self, handler: Arc<dyn EventHandler>) {
        self.subscriptions.lock().wildcard.push(handler);
    }

    pub fn clear(&self) {
        let mut subs = self.subscriptions.lock();
        subs.by_type.clear();
        subs.wildcard.clear();
    }

    fn handlers_for(&self, event_type: &str) -> Vec<Arc<dyn EventHandler>> {
        let subs = self.subscriptions.lock();
        let mut handlers = subs.by_type.get(event_type).cloned().unwrap_or_default();
        handlers.extend(subs.wildcard.iter().cloned());
        handlers
    }

    /// Dispatches according to the bus's default mode (§4.8).
    pub async fn publish(&self, event: Event) -> Result<()> {
        if self.default_async.load(Ordering::SeqCst) {
            self.publish_async(event).await;
            Ok(())
        } else {
            self.publish_sync(event).await
        }
    }

    /// Runs handlers in subscription order on the calling task; the first
    /// error aborts the remaining handlers and is returned.
    pub async fn publish_sync(&self, event: Event) -> Result<()> {
        for handler in self.handlers_for(&event.event_type) {
            if let Err(err) = handler.handle(&event).await {
                warn!(
                    event_type = %event.event_type,
                    handler = handler.name(),
                    error = %err,
                    "event handler failed; aborting remaining handlers"
                );
                return Err(WardenError::Internal(format!(
                    "handler '{}' failed for event '{}': {err}",
                    handler.name(),
                    event.event_type
                )));
            }
        }
        Ok(())
    }

    /// Runs each handler on a detached task; errors are logged and dropped.
    pub async fn publish_async(&self, event: Event) {
        for handler in self.handlers_for(&event.event_type) {
            let event = event.clone();
            tokio::spawn(async move {
                if let Err(err) = handler.handle(&event).await {
                    error!(
                        event_type = %event.event_type,
                        handler = handler.name(),
                        error = %err,
                        "event handler failed (async dispatch, error dropped)"
                    );
                }
            });
        }
    }
}
