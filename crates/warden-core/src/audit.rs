//! `AuditEvent` — the append-only record shape (§3, §4.9). Storage and
//! querying live in `warden-audit`; this crate only defines the shape so
//! every layer that emits or reads audit events agrees on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    WorkflowCreated,
    WorkflowStarted,
    WorkflowCompleted,
    WorkflowFailed,
    StepExecuted,
    PolicyEvaluated,
    PolicyViolation,
    ApprovalRequested,
    ApprovalGranted,
    ApprovalRejected,
    AgentCalled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub event_type: AuditEventType,
    pub actor: String,
    pub resource_type: String,
    pub resource_id: String,
    pub action: String,
    pub details: HashMap<String, serde_json::Value>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    #[must_use]
    pub fn new(
        event_type: AuditEventType,
        actor: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            actor: actor.into(),
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            action: action.into(),
            details: HashMap::new(),
            trace_id: None,
            span_id: None,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: HashMap<String, serde_json::Value>) -> Self {
        self.details = details;
        self
    }

    #[must_use]
    pub fn with_trace(mut self, trace_id: impl Into<String>, span_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self.span_id = Some(span_id.into());
        self
    }
}

/// A filter for `Query` over the audit log (§4.9): any-of on types,
/// equality on actor/resource, inclusive time range, then `offset`/`limit`.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub event_types: Vec<AuditEventType>,
    pub actor: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl AuditFilter {
    #[must_use]
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if !self.event_types.is_empty() && !self.event_types.contains(&event.event_type) {
            return false;
        }
        if let Some(actor) = &self.actor {
            if actor != &event.actor {
                return false;
            }
        }
        if let Some(rt) = &self.resource_type {
            if rt != &event.resource_type {
                return false;
            }
        }
        if let Some(rid) = &self.resource_id {
            if rid != &event.resource_id {
                return false;
            }
        }
        if let Some(since) = self.since {
            if event.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if event.timestamp > until {
                return false;
            }
        }
        true
    }
}
