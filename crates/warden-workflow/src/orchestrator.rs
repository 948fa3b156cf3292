//! The orchestrator (§4.1): composes repository, policy evaluator, audit
//! log, event bus, and the step executor into `CreateWorkflow`,
//! `CreateRun`, `ExecuteWorkflow`, `ResumeWorkflow`, and the approval
//! commands the CLI drives (§6).

use crate::executor::StepExecutor;
use crate::state_machine::{RunEvent, RunState, RunStateMachine};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use warden_audit::AuditService;
use warden_core::{
    Approval, CancelContext, PolicyBundle, PolicyInput, Result, RunId, RunStatus, WardenError,
    WorkflowDefinition, WorkflowRun,
};
use warden_events::{Event, EventBus};
use warden_policy::evaluate_all;
use warden_repository::Repository;

pub struct Orchestrator {
    repository: Arc<dyn Repository>,
    executor: StepExecutor,
    audit: Arc<AuditService>,
    events: Arc<EventBus>,
    policies: RwLock<Vec<PolicyBundle>>,
    /// Approval requests keyed by run id (§6's `approve <run-id>`) — kept
    /// in-process since the `approval_requests` table is a persistence-layout
    /// detail (§6) that sits outside the `Repository` contract proper (§4.10).
    approvals: RwLock<HashMap<RunId, Approval>>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        repository: Arc<dyn Repository>,
        executor: StepExecutor,
        audit: Arc<AuditService>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            repository,
            executor,
            audit,
            events,
            policies: RwLock::new(Vec::new()),
            approvals: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_policies(&self, bundles: Vec<PolicyBundle>) {
        *self.policies.write() = bundles;
    }

    async fn publish(&self, event_type: &str, payload: serde_json::Value) {
        let serde_json::Value::Object(map) = payload else {
            return;
        };
        let event = Event::new(event_type)
            .with_payload(map.into_iter().collect::<HashMap<_, _>>());
        if let Err(err) = self.events.publish(event).await {
            warn!(event_type = %event_type, error = %err, "event dispatch failed");
        }
    }

    /// `CreateWorkflow(cfg)` — `cfg` arrives already validated by
    /// [`WorkflowDefinition::new`]; this persists it and announces it.
    pub async fn create_workflow(&self, definition: WorkflowDefinition) -> Result<WorkflowDefinition> {
        let persisted = self.repository.create_definition(definition).await?;
        self.audit
            .log_workflow_created(&persisted.id.to_string(), &persisted.name)
            .await;
        self.publish(
            "workflow.created",
            serde_json::json!({"workflow_id": persisted.id.to_string(), "name": persisted.name}),
        )
        .await;
        Ok(persisted)
    }

    pub async fn create_run(
        &self,
        definition: &WorkflowDefinition,
        triggered_by: impl Into<String> + Send,
        trigger_data: serde_json::Value,
    ) -> Result<WorkflowRun> {
        let triggered_by = triggered_by.into();
        let run = WorkflowRun::new(definition, triggered_by.clone(), trigger_data);
        let run = self.repository.create_run(run).await?;
        self.audit
            .log_workflow_started(&run.id.to_string(), &run.workflow_name, &triggered_by)
            .await;
        Ok(run)
    }

    /// `ExecuteWorkflow(run)` (§4.1): policy check, approval gate, then the
    /// sequential step loop. `cancel` is the caller's invocation context —
    /// cancelling it mid-step propagates run → step → agent → provider
    /// (§5), and the step is left in whatever status it was in when the
    /// provider call was interrupted (§9 open question 1).
    pub async fn execute_workflow(
        &self,
        run: WorkflowRun,
        definition: &WorkflowDefinition,
        cancel: &CancelContext,
    ) -> Result<WorkflowRun> {
        let mut sm = RunStateMachine::new();
        sm.apply(RunEvent::Start);
        let mut run = run;
        run.start();
        self.repository.update_run(run.clone()).await?;

        let policy = self.evaluate_policy(&run, definition);
        self.audit
            .log_policy_evaluated(&run.id.to_string(), policy.allowed, policy.requires_approval)
            .await;
        for violation in &policy.violations {
            self.audit.log_policy_violation(&run.id.to_string(), violation).await;
        }

        if !policy.allowed {
            sm.apply(RunEvent::PolicyFail);
            let message = format!("policy violation: {}", policy.joined_violation_messages());
            run.fail(message.clone());
            self.repository.update_run(run.clone()).await?;
            self.audit.log_workflow_failed(&run.id.to_string(), &message).await;
            self.publish("workflow.failed", serde_json::json!({"run_id": run.id.to_string(), "reason": message})).await;
            return Err(WardenError::PolicyViolation(message));
        }
        sm.apply(RunEvent::PolicyPass);

        if policy.requires_approval {
            sm.apply(RunEvent::ApprovalRequired);
            let step_name = run
                .current_step()
                .map(|s| s.name.clone())
                .unwrap_or_default();
            let approval = Approval::new(run.id, definition.id, &definition.name, &step_name, Vec::new());
            self.approvals.write().insert(run.id, approval);
            run.await_approval();
            self.repository.update_run(run.clone()).await?;
            self.audit.log_approval_requested(&run.id.to_string(), &step_name).await;
            return Err(WardenError::ApprovalRequired);
        }
        sm.apply(RunEvent::NoApproval);
        run.begin_executing();
        self.repository.update_run(run.clone()).await?;

        self.run_steps(sm, run, definition, cancel).await
    }

    /// `ResumeWorkflow(run)` (§4.1) — only from `awaiting_approval`.
    pub async fn resume_workflow(
        &self,
        run: WorkflowRun,
        definition: &WorkflowDefinition,
        cancel: &CancelContext,
    ) -> Result<WorkflowRun> {
        if run.status != RunStatus::AwaitingApproval {
            return Err(WardenError::RunAlreadyStarted(run.id.to_string()));
        }
        let mut sm = RunStateMachine::from_state(RunState::AwaitingApproval);
        sm.apply(RunEvent::Approved);
        let mut run = run;
        run.begin_executing();
        self.repository.update_run(run.clone()).await?;
        self.run_steps(sm, run, definition, cancel).await
    }

    pub async fn approve_run(&self, run_id: RunId, approver: &str, note: Option<String>) -> Result<WorkflowRun> {
        {
            let mut approvals = self.approvals.write();
            let approval = approvals
                .get_mut(&run_id)
                .ok_or_else(|| WardenError::ApprovalNotFound(run_id.to_string()))?;
            approval.approve(approver, note, Utc::now())?;
        }
        self.audit.log_approval_granted(&run_id.to_string(), approver).await;

        let run = self.repository.get_run(run_id).await?;
        let definition = self.repository.get(run.workflow_id).await?;
        self.resume_workflow(run, &definition, &CancelContext::new()).await
    }

    pub async fn reject_run(&self, run_id: RunId, approver: &str, note: Option<String>) -> Result<WorkflowRun> {
        {
            let mut approvals = self.approvals.write();
            let approval = approvals
                .get_mut(&run_id)
                .ok_or_else(|| WardenError::ApprovalNotFound(run_id.to_string()))?;
            approval.reject(approver, note, Utc::now())?;
        }
        let mut run = self.repository.get_run(run_id).await?;
        run.cancel();
        self.repository.update_run(run.clone()).await
    }

    pub async fn get_run(&self, id: RunId) -> Result<WorkflowRun> {
        self.repository.get_run(id).await
    }

    pub async fn list_active_runs(&self) -> Result<Vec<WorkflowRun>> {
        self.repository.list_active_runs().await
    }

    fn evaluate_policy(&self, run: &WorkflowRun, definition: &WorkflowDefinition) -> warden_core::PolicyResult {
        let step_name = run.current_step().map(|s| s.name.clone()).unwrap_or_default();

        // The run's own context mapping (step outputs so far) takes
        // precedence; trigger data fills in anything not already there, so
        // rules can see e.g. `context.path` straight from the trigger before
        // any step has run.
        let mut context = run.context.clone();
        if let serde_json::Value::Object(trigger) = &run.trigger_data {
            for (key, value) in trigger {
                context.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        let input = PolicyInput {
            workflow_id: definition.id.to_string(),
            workflow_name: definition.name.clone(),
            run_id: run.id.to_string(),
            step_name,
            agent_id: String::new(),
            agent_name: String::new(),
            capabilities: Vec::new(),
            context,
            metadata: definition.metadata.clone(),
        };
        evaluate_all(self.policies.read().iter(), &input)
    }

    /// The sequential step loop (`executeSteps`, §4.1). `sm` must already
    /// be in [`RunState::Executing`].
    async fn run_steps(
        &self,
        mut sm: RunStateMachine,
        mut run: WorkflowRun,
        definition: &WorkflowDefinition,
        cancel: &CancelContext,
    ) -> Result<WorkflowRun> {
        loop {
            if !run.has_more_steps() {
                sm.apply(RunEvent::AllDone);
                run.complete();
                self.repository.update_run(run.clone()).await?;
                let (tokens_in, tokens_out) = run.total_tokens();
                self.audit.log_workflow_completed(&run.id.to_string(), tokens_in, tokens_out).await;
                self.publish("workflow.completed", serde_json::json!({"run_id": run.id.to_string()})).await;
                return Ok(run);
            }

            let idx = run.current_step_index;
            let mut step = run.steps[idx].clone();

            match self.executor.execute_step(definition, &run, &mut step, cancel).await {
                Ok(output) => {
                    step.complete(output.clone());
                    run.steps[idx] = step.clone();
                    self.repository.update_step(run.id, step.clone()).await?;
                    sm.apply(RunEvent::StepComplete);

                    self.audit
                        .log_step_executed(&run.id.to_string(), &step.name, output.tokens_in, output.tokens_out)
                        .await;
                    run.set_context(format!("steps.{}.output", step.name), output.to_value());
                    run.advance_step();
                    self.repository.update_run(run.clone()).await?;

                    if run.has_more_steps() {
                        sm.apply(RunEvent::HasNext);
                    }
                }
                Err(err) if cancel.is_cancelled() => {
                    // Cancellation mid-step (§9 open question 1, §8 S6): the
                    // step is left in whatever status `execute_step` last set
                    // it to (`running`), the run stays `executing`, and no
                    // further repository/audit/event mutation happens here —
                    // the caller is responsible for explicitly cancelling,
                    // failing, or resuming the run afterward.
                    return Err(err);
                }
                Err(err) => {
                    step.fail(&err);
                    run.steps[idx] = step.clone();
                    self.repository.update_step(run.id, step.clone()).await?;
                    sm.apply(RunEvent::StepFailed);

                    if step.can_retry() {
                        let mut retried = step;
                        retried.increment_retry();
                        run.steps[idx] = retried.clone();
                        self.repository.update_step(run.id, retried).await?;
                        sm.apply(RunEvent::Retry);
                        continue;
                    }

                    sm.apply(RunEvent::Abort);
                    let message = format!("step {} failed: {err}", run.steps[idx].name);
                    run.fail(message.clone());
                    self.repository.update_run(run.clone()).await?;
                    self.audit.log_workflow_failed(&run.id.to_string(), &message).await;
                    self.publish("workflow.failed", serde_json::json!({"run_id": run.id.to_string(), "reason": message})).await;
                    return Err(err);
                }
            }
        }
    }
}
