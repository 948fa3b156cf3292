//! Append-only `AuditLog` contract plus the default in-memory
//! implementation (§4.9). Grounded on the storage-trait-with-backends
//! posture of `llmspell-hooks::persistence::storage_backend::StorageBackend`.

use async_trait::async_trait;
use parking_lot::RwLock;
use warden_core::{AuditEvent, AuditFilter};

#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, event: AuditEvent);

    /// Matches every set field of `filter` (any-of for types, equality for
    /// actor/resource, inclusive for time range), then applies `offset`
    /// followed by `limit` (§4.9).
    async fn query(&self, filter: &AuditFilter) -> Vec<AuditEvent>;
}

/// Default in-memory implementation; keeps events in insertion order.
#[derive(Default)]
pub struct InMemoryAuditLog {
    events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryAuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, event: AuditEvent) {
        self.events.write().push(event);
    }

    async fn query(&self, filter: &AuditFilter) -> Vec<AuditEvent> {
        let matched: Vec<AuditEvent> = self
            .events
            .read()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();

        // "if offset ≥ length, return empty; else clamp length" — same
        // pagination convention the repository contract uses (§4.10).
        if filter.offset >= matched.len() {
            return Vec::new();
        }
        let remaining = &matched[filter.offset..];
        match filter.limit {
            Some(limit) => remaining.iter().take(limit).cloned().collect(),
            None => remaining.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::AuditEventType;

    #[tokio::test]
    async fn append_then_query_in_insertion_order() {
        let log = InMemoryAuditLog::new();
        log.append(AuditEvent::new(
            AuditEventType::WorkflowStarted,
            "a",
            "run",
            "1",
            "start",
        ))
        .await;
        log.append(AuditEvent::new(
            AuditEventType::WorkflowCompleted,
            "a",
            "run",
            "1",
            "complete",
        ))
        .await;

        let all = log.query(&AuditFilter::default()).await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].event_type, AuditEventType::WorkflowStarted);
        assert_eq!(all[1].event_type, AuditEventType::WorkflowCompleted);
    }

    #[tokio::test]
    async fn pagination_clamps_and_empties_past_the_end() {
        let log = InMemoryAuditLog::new();
        for i in 0..5 {
            log.append(AuditEvent::new(
                AuditEventType::StepExecuted,
                "a",
                "step",
                i.to_string(),
                "run",
            ))
            .await;
        }

        let mut filter = AuditFilter {
            offset: 3,
            limit: Some(10),
            ..Default::default()
        };
        let page = log.query(&filter).await;
        assert_eq!(page.len(), 2);

        filter.offset = 100;
        assert!(log.query(&filter).await.is_empty());
    }

    #[tokio::test]
    async fn query_filters_by_resource_and_actor() {
        let log = InMemoryAuditLog::new();
        log.append(AuditEvent::new(
            AuditEventType::AgentCalled,
            "alice",
            "run",
            "r1",
            "invoke",
        ))
        .await;
        log.append(AuditEvent::new(
            AuditEventType::AgentCalled,
            "bob",
            "run",
            "r2",
            "invoke",
        ))
        .await;

        let filter = AuditFilter {
            actor: Some("alice".to_string()),
            ..Default::default()
        };
        let results = log.query(&filter).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].resource_id, "r1");
    }
}
