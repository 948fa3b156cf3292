//! The event envelope published on the bus (§4.8). Distinct from
//! [`warden_core::AuditEvent`]: this is transient in-process pub/sub, not
//! the persisted audit trail.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

/// A domain event flowing through the bus. `event_type` is a dotted name
/// such as `"step.started"` or `"workflow.completed"`; `*` is reserved for
/// [`crate::bus::EventBus::subscribe_all`] and must not be used as a
/// concrete event type.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub payload: HashMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: HashMap<String, Value>) -> Self {
        self.payload = payload;
        self
    }
}
