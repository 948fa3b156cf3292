//! `WorkflowRun` and `StepRun` — the mutable execution-time aggregates, plus
//! the status enums and the lifecycle methods the orchestrator drives them
//! through (spec §4.1's `executeSteps` pseudocode).

use crate::error::WardenError;
use crate::ids::{AgentId, RunId, StepId, WorkflowId};
use crate::workflow::WorkflowDefinition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Coarse, persisted run status (§3). The richer interpreter states from
/// §4.7 (`check_approval`, `check_next`, `step_failed`) live only inside the
/// active state-machine interpreter in `warden-workflow` — never here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    PolicyCheck,
    AwaitingApproval,
    Executing,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

/// The `{content, tokens_in, tokens_out, duration_ms, model, finish_reason,
/// tool_calls?}` shape a completed step's output takes (§4.2, §9). Stored
/// as a schemaless JSON value inside the run's context map and as the
/// step's own `output` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutput {
    pub content: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub duration_ms: u64,
    pub model: String,
    pub finish_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<serde_json::Value>,
}

impl StepOutput {
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("StepOutput always serializes")
    }
}

/// One execution of a [`crate::workflow::StepDefinition`] within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRun {
    pub id: StepId,
    pub run_id: RunId,
    pub index: usize,
    pub name: String,
    pub agent_id: AgentId,
    pub status: StepStatus,
    pub input: HashMap<String, serde_json::Value>,
    pub output: Option<serde_json::Value>,
    pub requires_approval: bool,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_count: u32,
    pub error: Option<String>,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StepRun {
    #[must_use]
    pub fn from_definition(run_id: RunId, index: usize, def: &crate::workflow::StepDefinition) -> Self {
        Self {
            id: StepId::new(),
            run_id,
            index,
            name: def.name.clone(),
            agent_id: AgentId::nil(),
            status: StepStatus::Pending,
            input: def.input.clone(),
            output: None,
            requires_approval: def.requires_approval,
            timeout: def.timeout,
            max_retries: def.retries,
            retry_count: 0,
            error: None,
            tokens_in: 0,
            tokens_out: 0,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn start(&mut self) {
        self.status = StepStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn complete(&mut self, output: StepOutput) {
        self.tokens_in = output.tokens_in;
        self.tokens_out = output.tokens_out;
        self.output = Some(output.to_value());
        self.status = StepStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, err: impl std::fmt::Display) {
        self.error = Some(err.to_string());
        self.status = StepStatus::Failed;
        self.completed_at = Some(Utc::now());
    }

    /// `CanRetry ⇔ status=failed ∧ retry_count<max_retries` (§3).
    #[must_use]
    pub fn can_retry(&self) -> bool {
        self.status == StepStatus::Failed && self.retry_count < self.max_retries
    }

    /// Reset to `pending` and clear error/timestamps, incrementing the
    /// retry counter.
    pub fn increment_retry(&mut self) {
        self.retry_count += 1;
        self.status = StepStatus::Pending;
        self.error = None;
        self.started_at = None;
        self.completed_at = None;
    }
}

/// The aggregate root of a workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: RunId,
    pub workflow_id: WorkflowId,
    pub workflow_name: String,
    pub workflow_version: String,
    pub status: RunStatus,
    pub current_step_index: usize,
    pub steps: Vec<StepRun>,
    pub context: HashMap<String, serde_json::Value>,
    pub triggered_by: String,
    pub trigger_data: serde_json::Value,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowRun {
    #[must_use]
    pub fn new(
        def: &WorkflowDefinition,
        triggered_by: impl Into<String>,
        trigger_data: serde_json::Value,
    ) -> Self {
        let id = RunId::new();
        let steps = def
            .steps
            .iter()
            .enumerate()
            .map(|(idx, s)| StepRun::from_definition(id, idx, s))
            .collect();
        let now = Utc::now();
        Self {
            id,
            workflow_id: def.id,
            workflow_name: def.name.clone(),
            workflow_version: def.version.clone(),
            status: RunStatus::Pending,
            current_step_index: 0,
            steps,
            context: HashMap::new(),
            triggered_by: triggered_by.into(),
            trigger_data,
            error: None,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn has_more_steps(&self) -> bool {
        self.current_step_index < self.steps.len()
    }

    pub fn current_step(&self) -> Option<&StepRun> {
        self.steps.get(self.current_step_index)
    }

    pub fn current_step_mut(&mut self) -> Option<&mut StepRun> {
        self.steps.get_mut(self.current_step_index)
    }

    pub fn advance_step(&mut self) {
        self.current_step_index += 1;
        self.touch();
    }

    pub fn set_context(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.context.insert(key.into(), value);
        self.touch();
    }

    pub fn get_context(&self, key: &str) -> Option<&serde_json::Value> {
        self.context.get(key)
    }

    pub fn start(&mut self) {
        self.status = RunStatus::PolicyCheck;
        self.started_at = Some(Utc::now());
        self.touch();
    }

    pub fn begin_executing(&mut self) {
        self.status = RunStatus::Executing;
        self.touch();
    }

    pub fn await_approval(&mut self) {
        self.status = RunStatus::AwaitingApproval;
        self.touch();
    }

    /// Terminal transition to `completed`. Idempotent: a second call after
    /// the run is already terminal is a no-op (§8 `UpdateRun` idempotence
    /// law).
    pub fn complete(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = RunStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.touch();
    }

    /// Terminal transition to `failed` with a message, composed by the
    /// caller per the `"step <name> failed: <cause>"` / `"policy
    /// violation: ..."` conventions in §7.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = RunStatus::Failed;
        self.error = Some(message.into());
        self.completed_at = Some(Utc::now());
        self.touch();
    }

    pub fn cancel(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = RunStatus::Cancelled;
        self.completed_at = Some(Utc::now());
        self.touch();
    }

    /// `run.total_tokens` testable property (§8 property 4): summed over
    /// completed steps only.
    #[must_use]
    pub fn total_tokens(&self) -> (u64, u64) {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .fold((0, 0), |(i, o), s| (i + s.tokens_in, o + s.tokens_out))
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn validate_invariants(&self) -> Result<(), WardenError> {
        if self.current_step_index > self.steps.len() {
            return Err(WardenError::Internal(
                "current_step_index out of bounds".into(),
            ));
        }
        if self.status.is_terminal() != self.completed_at.is_some() {
            return Err(WardenError::Internal(
                "completed_at must be set iff status is terminal".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::StepDefinition;
    use std::collections::HashMap as Map;

    fn def(names: &[&str]) -> WorkflowDefinition {
        let steps = names
            .iter()
            .map(|n| StepDefinition::new(*n, "echo-agent"))
            .collect();
        WorkflowDefinition::new("wf", "1.0", "d", steps, vec![], vec![], Map::new()).unwrap()
    }

    #[test]
    fn empty_step_list_is_not_constructible_but_single_step_completes_immediately() {
        let d = def(&["only"]);
        let mut run = WorkflowRun::new(&d, "manual", serde_json::json!({}));
        assert!(run.has_more_steps());
        run.advance_step();
        assert!(!run.has_more_steps());
        assert!(run.current_step().is_none());
        run.complete();
        assert_eq!(run.status, RunStatus::Completed);
    }

    #[test]
    fn terminal_stability_blocks_further_mutation() {
        let d = def(&["a"]);
        let mut run = WorkflowRun::new(&d, "manual", serde_json::json!({}));
        run.complete();
        let completed_at = run.completed_at;
        run.fail("should not apply");
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.completed_at, completed_at);
        assert!(run.error.is_none());
    }

    #[test]
    fn update_run_idempotence_law() {
        let d = def(&["a"]);
        let mut run = WorkflowRun::new(&d, "manual", serde_json::json!({}));
        run.fail("boom");
        let state_after_first = (run.status, run.error.clone(), run.completed_at);
        run.fail("boom again");
        assert_eq!((run.status, run.error.clone(), run.completed_at), state_after_first);
    }

    #[test]
    fn retry_bound_and_reset_semantics() {
        let mut step = StepRun::from_definition(RunId::new(), 0, &StepDefinition {
            retries: 2,
            ..StepDefinition::new("s", "a")
        });
        step.fail("boom");
        assert!(step.can_retry());
        step.increment_retry();
        assert_eq!(step.retry_count, 1);
        assert_eq!(step.status, StepStatus::Pending);
        assert!(step.error.is_none());

        step.fail("boom");
        step.increment_retry();
        assert_eq!(step.retry_count, 2);
        step.fail("boom");
        assert!(!step.can_retry());
    }

    #[test]
    fn token_accounting_sums_only_completed_steps() {
        let d = def(&["a", "b"]);
        let mut run = WorkflowRun::new(&d, "manual", serde_json::json!({}));
        run.steps[0].complete(StepOutput {
            content: "ok".into(),
            tokens_in: 3,
            tokens_out: 5,
            duration_ms: 1,
            model: "m".into(),
            finish_reason: "stop".into(),
            tool_calls: None,
        });
        // step b left pending (not completed) — must not count.
        run.steps[1].tokens_in = 100;
        run.steps[1].tokens_out = 100;
        assert_eq!(run.total_tokens(), (3, 5));
    }

    #[test]
    fn invariants_catch_out_of_bounds_index() {
        let d = def(&["a"]);
        let mut run = WorkflowRun::new(&d, "manual", serde_json::json!({}));
        run.current_step_index = 99;
        assert!(run.validate_invariants().is_err());
    }
}
