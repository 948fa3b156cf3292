//! End-to-end scenarios driving the orchestrator through a real
//! repository, policy evaluator, audit log, and event bus, with stub
//! providers standing in for the network. One test per named scenario.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use warden_agents::{AgentConfig, AgentRegistry, AgentRunner};
use warden_audit::{AuditService, InMemoryAuditLog};
use warden_core::{
    CancelContext, PolicyBundle, PolicyRule, RunStatus, Severity, StepDefinition, StepStatus,
    Trigger, WardenError, WorkflowDefinition,
};
use warden_events::EventBus;
use warden_providers::{
    CompletionRequest, CompletionResponse, FinishReason, Provider, ProviderError, ProviderRegistry,
};
use warden_repository::{InMemoryRepository, Repository};
use warden_workflow::{Orchestrator, StepExecutor};

struct EchoProvider;

#[async_trait]
impl Provider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }
    fn models(&self) -> Vec<String> {
        vec!["echo-1".to_string()]
    }
    async fn complete(
        &self,
        req: &CompletionRequest,
        _cancel: &CancellationToken,
    ) -> std::result::Result<CompletionResponse, ProviderError> {
        Ok(CompletionResponse {
            content: req.messages.last().map(|m| m.content.clone()).unwrap_or_default(),
            tool_calls: None,
            tokens_in: 3,
            tokens_out: 2,
            duration_ms: 1,
            model: req.model.clone(),
            finish_reason: FinishReason::Stop,
        })
    }
}

/// Fails its first `flaky_attempts` calls with a retryable error, then
/// succeeds — drives the retry-then-succeed and retries-exhausted
/// scenarios from the same stub.
struct FlakyProvider {
    attempts: AtomicUsize,
    flaky_attempts: usize,
}

impl FlakyProvider {
    fn new(flaky_attempts: usize) -> Self {
        Self { attempts: AtomicUsize::new(0), flaky_attempts }
    }
}

#[async_trait]
impl Provider for FlakyProvider {
    fn name(&self) -> &str {
        "flaky"
    }
    fn models(&self) -> Vec<String> {
        vec!["flaky-1".to_string()]
    }
    async fn complete(
        &self,
        req: &CompletionRequest,
        _cancel: &CancellationToken,
    ) -> std::result::Result<CompletionResponse, ProviderError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.flaky_attempts {
            return Err(ProviderError::new("flaky", Some(503), "temporarily unavailable"));
        }
        Ok(CompletionResponse {
            content: "recovered".into(),
            tool_calls: None,
            tokens_in: 1,
            tokens_out: 1,
            duration_ms: 1,
            model: req.model.clone(),
            finish_reason: FinishReason::Stop,
        })
    }
}

/// Blocks until its own cancellation token is cancelled, then fails —
/// stands in for a long-running provider call interrupted mid-flight.
struct HangingProvider;

#[async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }
    fn models(&self) -> Vec<String> {
        vec!["hanging-1".to_string()]
    }
    async fn complete(
        &self,
        _req: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> std::result::Result<CompletionResponse, ProviderError> {
        cancel.cancelled().await;
        Err(ProviderError::new("hanging", None, "request cancelled"))
    }
}

struct Harness {
    orchestrator: Orchestrator,
    repository: Arc<InMemoryRepository>,
}

fn harness(provider: Arc<dyn Provider>, agent_name: &str, model: &str) -> Harness {
    let provider_registry = Arc::new(ProviderRegistry::new());
    let provider_name = provider.name().to_string();
    provider_registry.register(provider);

    let agents = Arc::new(AgentRegistry::new());
    agents.register(AgentConfig::new(agent_name, &provider_name, model));

    let audit = Arc::new(AuditService::new(Arc::new(InMemoryAuditLog::new())));
    let runner = Arc::new(AgentRunner::new(provider_registry));
    let executor = StepExecutor::new(agents, runner, audit.clone());
    let repository = Arc::new(InMemoryRepository::new());
    let events = Arc::new(EventBus::new());

    Harness {
        orchestrator: Orchestrator::new(repository.clone(), executor, audit, events),
        repository,
    }
}

fn definition(step_name: &str, agent: &str, retries: u32) -> WorkflowDefinition {
    let step = StepDefinition {
        retries,
        ..StepDefinition::new(step_name, agent)
    };
    WorkflowDefinition::new("greet-workflow", "1.0", "d", vec![step], vec![Trigger::Manual], vec![], HashMap::new())
        .unwrap()
}

fn deny_env_bundle() -> PolicyBundle {
    PolicyBundle {
        id: warden_core::PolicyBundleId::new(),
        name: "no-secrets".into(),
        version: "1".into(),
        description: "d".into(),
        rules: vec![PolicyRule {
            name: "deny-env".into(),
            enabled: true,
            severity: Severity::Error,
            source: serde_json::to_string(&serde_json::json!({
                "when": {"op": "context_contains", "path": "context.path", "value": ".env"},
                "deny": true,
                "violation_message": "access to .env files is forbidden",
            }))
            .unwrap(),
        }],
        active: true,
        checksum: String::new(),
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

fn approval_bundle() -> PolicyBundle {
    PolicyBundle {
        id: warden_core::PolicyBundleId::new(),
        name: "sensitive-step".into(),
        version: "1".into(),
        description: "d".into(),
        rules: vec![PolicyRule {
            name: "needs-approval".into(),
            enabled: true,
            severity: Severity::Warning,
            source: serde_json::to_string(&serde_json::json!({
                "when": {"op": "always"},
                "require_approval": true,
            }))
            .unwrap(),
        }],
        active: true,
        checksum: String::new(),
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

/// S1 — happy path: create, run, complete, tokens accumulate.
#[tokio::test]
async fn s1_happy_path_completes_and_accumulates_tokens() {
    let h = harness(Arc::new(EchoProvider), "greeter", "echo-1");
    let def = h
        .orchestrator
        .create_workflow(definition("greet", "greeter", 0))
        .await
        .unwrap();
    let run = h
        .orchestrator
        .create_run(&def, "manual", serde_json::json!({}))
        .await
        .unwrap();

    let completed = h
        .orchestrator
        .execute_workflow(run, &def, &CancelContext::new())
        .await
        .unwrap();

    assert_eq!(completed.status, RunStatus::Completed);
    assert_eq!(completed.steps[0].status, StepStatus::Completed);
    assert_eq!(completed.total_tokens(), (3, 2));
}

/// S2 — policy block: trigger data containing `.env` is denied before any
/// step executes.
#[tokio::test]
async fn s2_policy_block_denies_before_any_step_runs() {
    let h = harness(Arc::new(EchoProvider), "greeter", "echo-1");
    h.orchestrator.set_policies(vec![deny_env_bundle()]);
    let def = h
        .orchestrator
        .create_workflow(definition("greet", "greeter", 0))
        .await
        .unwrap();
    let run = h
        .orchestrator
        .create_run(&def, "manual", serde_json::json!({"path": ".env.local"}))
        .await
        .unwrap();

    let err = h
        .orchestrator
        .execute_workflow(run.clone(), &def, &CancelContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::PolicyViolation(_)));

    let persisted = h.repository.get_run(run.id).await.unwrap();
    assert_eq!(persisted.status, RunStatus::Failed);
    assert_eq!(persisted.steps[0].status, StepStatus::Pending);
}

/// S3 — approval gate: policy requires approval, run parks in
/// `awaiting_approval`, and approving it resumes execution to completion.
#[tokio::test]
async fn s3_approval_gate_then_resume_completes() {
    let h = harness(Arc::new(EchoProvider), "greeter", "echo-1");
    h.orchestrator.set_policies(vec![approval_bundle()]);
    let def = h
        .orchestrator
        .create_workflow(definition("greet", "greeter", 0))
        .await
        .unwrap();
    let run = h
        .orchestrator
        .create_run(&def, "manual", serde_json::json!({}))
        .await
        .unwrap();

    let err = h
        .orchestrator
        .execute_workflow(run.clone(), &def, &CancelContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::ApprovalRequired));

    let parked = h.repository.get_run(run.id).await.unwrap();
    assert_eq!(parked.status, RunStatus::AwaitingApproval);

    let resumed = h.orchestrator.approve_run(run.id, "alice", None).await.unwrap();
    assert_eq!(resumed.status, RunStatus::Completed);
}

/// S3b — rejecting the same gated run cancels it instead.
#[tokio::test]
async fn s3b_rejecting_a_gated_run_cancels_it() {
    let h = harness(Arc::new(EchoProvider), "greeter", "echo-1");
    h.orchestrator.set_policies(vec![approval_bundle()]);
    let def = h
        .orchestrator
        .create_workflow(definition("greet", "greeter", 0))
        .await
        .unwrap();
    let run = h
        .orchestrator
        .create_run(&def, "manual", serde_json::json!({}))
        .await
        .unwrap();
    h.orchestrator
        .execute_workflow(run.clone(), &def, &CancelContext::new())
        .await
        .unwrap_err();

    let rejected = h.orchestrator.reject_run(run.id, "bob", Some("no".into())).await.unwrap();
    assert_eq!(rejected.status, RunStatus::Cancelled);
}

/// S4 — retry then succeed: the step fails once, is retried within its
/// budget, and the run still completes.
#[tokio::test]
async fn s4_retry_then_succeed() {
    let h = harness(Arc::new(FlakyProvider::new(1)), "flaky-agent", "flaky-1");
    let def = h
        .orchestrator
        .create_workflow(definition("flaky-step", "flaky-agent", 2))
        .await
        .unwrap();
    let run = h
        .orchestrator
        .create_run(&def, "manual", serde_json::json!({}))
        .await
        .unwrap();

    let completed = h
        .orchestrator
        .execute_workflow(run, &def, &CancelContext::new())
        .await
        .unwrap();

    assert_eq!(completed.status, RunStatus::Completed);
    assert_eq!(completed.steps[0].retry_count, 1);
    assert_eq!(completed.steps[0].status, StepStatus::Completed);
}

/// S5 — retries exhausted: the step keeps failing past `max_retries` and
/// the run ends `failed`.
#[tokio::test]
async fn s5_retries_exhausted_fails_the_run() {
    let h = harness(Arc::new(FlakyProvider::new(10)), "flaky-agent", "flaky-1");
    let def = h
        .orchestrator
        .create_workflow(definition("flaky-step", "flaky-agent", 1))
        .await
        .unwrap();
    let run = h
        .orchestrator
        .create_run(&def, "manual", serde_json::json!({}))
        .await
        .unwrap();

    let err = h
        .orchestrator
        .execute_workflow(run.clone(), &def, &CancelContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::AgentUnavailable(_)));

    let persisted = h.repository.get_run(run.id).await.unwrap();
    assert_eq!(persisted.status, RunStatus::Failed);
    assert_eq!(persisted.steps[0].status, StepStatus::Failed);
    assert_eq!(persisted.steps[0].retry_count, 1);
}

/// S6 — cancellation mid-step: cancelling the invocation context during a
/// long provider call returns an error and leaves the run `executing`,
/// with no further mutation.
#[tokio::test]
async fn s6_cancellation_mid_step_leaves_run_executing() {
    let h = harness(Arc::new(HangingProvider), "hanger", "hanging-1");
    let def = h
        .orchestrator
        .create_workflow(definition("hang-step", "hanger", 0))
        .await
        .unwrap();
    let run = h
        .orchestrator
        .create_run(&def, "manual", serde_json::json!({}))
        .await
        .unwrap();

    let cancel = CancelContext::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        cancel_clone.cancel();
    });

    let err = h
        .orchestrator
        .execute_workflow(run.clone(), &def, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::AgentUnavailable(_)));

    let persisted = h.repository.get_run(run.id).await.unwrap();
    assert_eq!(persisted.status, RunStatus::Executing);
    assert_eq!(persisted.steps[0].status, StepStatus::Pending);
}

/// Completion, failure, and both approval commands publish via the event
/// bus without the call itself ever failing on a dispatch error — exercised
/// indirectly here by using the default (no subscribers) bus end to end.
#[tokio::test]
async fn orchestrator_runs_cleanly_with_no_event_subscribers() {
    let h = harness(Arc::new(EchoProvider), "greeter", "echo-1");
    let def = h
        .orchestrator
        .create_workflow(definition("greet", "greeter", 0))
        .await
        .unwrap();
    let run = h
        .orchestrator
        .create_run(&def, "manual", serde_json::json!({}))
        .await
        .unwrap();
    let completed = h
        .orchestrator
        .execute_workflow(run, &def, &CancelContext::new())
        .await
        .unwrap();
    assert_eq!(completed.status, RunStatus::Completed);
}

/// `list_active_runs` surfaces a parked run until it is resolved.
#[tokio::test]
async fn list_active_runs_includes_awaiting_approval() {
    let h = harness(Arc::new(EchoProvider), "greeter", "echo-1");
    h.orchestrator.set_policies(vec![approval_bundle()]);
    let def = h
        .orchestrator
        .create_workflow(definition("greet", "greeter", 0))
        .await
        .unwrap();
    let run = h
        .orchestrator
        .create_run(&def, "manual", serde_json::json!({}))
        .await
        .unwrap();
    h.orchestrator
        .execute_workflow(run.clone(), &def, &CancelContext::new())
        .await
        .unwrap_err();

    let active = h.orchestrator.list_active_runs().await.unwrap();
    assert!(active.iter().any(|r| r.id == run.id));
}
