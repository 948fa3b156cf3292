//! `AuditService` — typed emission helpers that construct the canonical
//! event shape for each domain occurrence (§4.9), sitting in front of an
//! [`AuditLog`]. Grounded on the collector-in-front-of-a-generic-store
//! pattern in `llmspell-hooks::collectors::agent_output`.

use crate::log::AuditLog;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use warden_core::{AuditEvent, AuditEventType, PolicyViolation};

pub struct AuditService {
    log: Arc<dyn AuditLog>,
}

impl AuditService {
    #[must_use]
    pub fn new(log: Arc<dyn AuditLog>) -> Self {
        Self { log }
    }

    async fn emit(&self, event: AuditEvent) {
        // Audit-log write errors are logged but never fail the containing
        // operation (§7) — `append` on this trait is infallible by design,
        // so there is nothing to swallow here beyond tracing the call.
        tracing::debug!(event_type = ?event.event_type, resource = %event.resource_id, "audit event");
        self.log.append(event).await;
    }

    pub async fn log_workflow_created(&self, workflow_id: &str, name: &str) {
        self.emit(AuditEvent::new(
            AuditEventType::WorkflowCreated,
            "orchestrator",
            "workflow",
            workflow_id,
            "create",
        ).with_details(HashMap::from([("name".into(), json!(name))])))
        .await;
    }

    pub async fn log_workflow_started(&self, run_id: &str, workflow_name: &str, triggered_by: &str) {
        self.emit(
            AuditEvent::new(AuditEventType::WorkflowStarted, triggered_by, "run", run_id, "start")
                .with_details(HashMap::from([("workflow_name".into(), json!(workflow_name))])),
        )
        .await;
    }

    pub async fn log_workflow_completed(&self, run_id: &str, tokens_in: u64, tokens_out: u64) {
        self.emit(
            AuditEvent::new(AuditEventType::WorkflowCompleted, "orchestrator", "run", run_id, "complete")
                .with_details(HashMap::from([
                    ("tokens_in".into(), json!(tokens_in)),
                    ("tokens_out".into(), json!(tokens_out)),
                ])),
        )
        .await;
    }

    pub async fn log_workflow_failed(&self, run_id: &str, reason: &str) {
        self.emit(
            AuditEvent::new(AuditEventType::WorkflowFailed, "orchestrator", "run", run_id, "fail")
                .with_details(HashMap::from([("reason".into(), json!(reason))])),
        )
        .await;
    }

    pub async fn log_step_executed(&self, run_id: &str, step_name: &str, tokens_in: u64, tokens_out: u64) {
        self.emit(
            AuditEvent::new(AuditEventType::StepExecuted, "executor", "step", step_name, "execute")
                .with_details(HashMap::from([
                    ("run_id".into(), json!(run_id)),
                    ("tokens_in".into(), json!(tokens_in)),
                    ("tokens_out".into(), json!(tokens_out)),
                ])),
        )
        .await;
    }

    pub async fn log_policy_evaluated(&self, run_id: &str, allowed: bool, requires_approval: bool) {
        self.emit(
            AuditEvent::new(AuditEventType::PolicyEvaluated, "policy", "run", run_id, "evaluate")
                .with_details(HashMap::from([
                    ("allowed".into(), json!(allowed)),
                    ("requires_approval".into(), json!(requires_approval)),
                ])),
        )
        .await;
    }

    pub async fn log_policy_violation(&self, run_id: &str, violation: &PolicyViolation) {
        self.emit(
            AuditEvent::new(AuditEventType::PolicyViolation, "policy", "run", run_id, "violate")
                .with_details(HashMap::from([
                    ("rule_name".into(), json!(violation.rule_name)),
                    ("message".into(), json!(violation.message)),
                    ("severity".into(), json!(format!("{:?}", violation.severity))),
                ])),
        )
        .await;
    }

    pub async fn log_approval_requested(&self, run_id: &str, step_name: &str) {
        self.emit(
            AuditEvent::new(AuditEventType::ApprovalRequested, "orchestrator", "run", run_id, "request_approval")
                .with_details(HashMap::from([("step_name".into(), json!(step_name))])),
        )
        .await;
    }

    pub async fn log_approval_granted(&self, run_id: &str, approved_by: &str) {
        self.emit(
            AuditEvent::new(AuditEventType::ApprovalGranted, approved_by, "run", run_id, "approve"),
        )
        .await;
    }

    pub async fn log_agent_called(
        &self,
        run_id: &str,
        step_id: &str,
        agent_name: &str,
        model: &str,
        tokens_in: u64,
        tokens_out: u64,
    ) {
        self.emit(
            AuditEvent::new(AuditEventType::AgentCalled, agent_name, "step", step_id, "call")
                .with_details(HashMap::from([
                    ("run_id".into(), json!(run_id)),
                    ("agent_name".into(), json!(agent_name)),
                    ("model".into(), json!(model)),
                    ("tokens_in".into(), json!(tokens_in)),
                    ("tokens_out".into(), json!(tokens_out)),
                ])),
        )
        .await;
    }
}
