//! The step executor (§4.2): resolves an agent, builds the provider
//! request, delegates to the [`AgentRunner`], and emits the `agent.called`
//! audit event. Returns a [`StepOutput`] the orchestrator folds into the
//! run's context — it does not itself call `step.Complete`/`step.Fail`,
//! which stay the orchestrator's responsibility per the step-loop
//! pseudocode (§4.1).

use std::sync::Arc;
use warden_agents::{AgentRegistry, AgentRunner};
use warden_core::{CancelContext, Result, StepOutput, StepRun, WardenError, WorkflowDefinition, WorkflowRun};
use warden_audit::AuditService;
use warden_providers::Message;

pub struct StepExecutor {
    agents: Arc<AgentRegistry>,
    runner: Arc<AgentRunner>,
    audit: Arc<AuditService>,
}

impl StepExecutor {
    #[must_use]
    pub fn new(agents: Arc<AgentRegistry>, runner: Arc<AgentRunner>, audit: Arc<AuditService>) -> Self {
        Self { agents, runner, audit }
    }

    /// Executes `step` (§4.2's algorithm). `step` is mutated in place for
    /// the `running`/`started_at` transition the algorithm calls for before
    /// the provider call; completion/failure remains the caller's job.
    pub async fn execute_step(
        &self,
        def: &WorkflowDefinition,
        run: &WorkflowRun,
        step: &mut StepRun,
        cancel: &CancelContext,
    ) -> Result<StepOutput> {
        let step_def = def
            .steps
            .get(step.index)
            .ok_or_else(|| WardenError::StepNotFound(step.name.clone()))?;

        let agent = self.agents.get_by_name(&step_def.agent)?;
        step.agent_id = agent.id;

        let mut input = step.input.clone();
        input.insert("trigger".to_string(), run.trigger_data.clone());
        input.insert(
            "context".to_string(),
            serde_json::to_value(&run.context).unwrap_or_default(),
        );

        step.start();

        let step_cancel = if step.timeout.is_zero() {
            cancel.clone()
        } else {
            cancel.child_with_timeout(step.timeout)
        };

        let formatted =
            serde_json::to_string_pretty(&input).unwrap_or_else(|_| "{}".to_string());
        let message = Message::user(format!("Execute step: {}\n\nInput:\n{formatted}", step.name));

        let response = self
            .runner
            .execute(&agent, vec![message], &step_cancel.token())
            .await?;

        self.audit
            .log_agent_called(
                &run.id.to_string(),
                &step.id.to_string(),
                &agent.name,
                &response.model,
                response.tokens_in,
                response.tokens_out,
            )
            .await;

        Ok(StepOutput {
            content: response.content,
            tokens_in: response.tokens_in,
            tokens_out: response.tokens_out,
            duration_ms: response.duration_ms,
            model: response.model,
            finish_reason: format!("{:?}", response.finish_reason).to_lowercase(),
            tool_calls: response.tool_calls,
        })
    }
}
