//! The `Repository` contract (§4.10): one shape, two backends — an
//! in-memory variant guarded by a single lock and a relational variant
//! that inserts a run and its steps in one transaction.

use async_trait::async_trait;
use warden_core::{RunId, StepId, StepRun, Result, WorkflowDefinition, WorkflowId, WorkflowRun};

#[async_trait]
pub trait Repository: Send + Sync {
    async fn create_definition(&self, definition: WorkflowDefinition) -> Result<WorkflowDefinition>;
    async fn get(&self, id: WorkflowId) -> Result<WorkflowDefinition>;
    async fn get_by_name(&self, name: &str) -> Result<WorkflowDefinition>;
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<WorkflowDefinition>>;
    async fn update(&self, definition: WorkflowDefinition) -> Result<WorkflowDefinition>;
    async fn delete(&self, id: WorkflowId) -> Result<()>;

    /// Creates the run and all of its child `StepRun`s atomically.
    async fn create_run(&self, run: WorkflowRun) -> Result<WorkflowRun>;
    /// Returns the run with its child `StepRun` list inflated.
    async fn get_run(&self, id: RunId) -> Result<WorkflowRun>;
    async fn list_runs(&self, workflow_id: WorkflowId, limit: usize, offset: usize) -> Result<Vec<WorkflowRun>>;
    async fn list_active_runs(&self) -> Result<Vec<WorkflowRun>>;
    async fn update_run(&self, run: WorkflowRun) -> Result<WorkflowRun>;

    async fn get_step(&self, run_id: RunId, step_id: StepId) -> Result<StepRun>;
    async fn update_step(&self, run_id: RunId, step: StepRun) -> Result<StepRun>;
}

/// Shared pagination rule (§4.10): if `offset` is past the end, return
/// nothing; otherwise clamp to what remains.
pub(crate) fn paginate<T: Clone>(items: &[T], limit: usize, offset: usize) -> Vec<T> {
    if offset >= items.len() {
        return Vec::new();
    }
    items[offset..].iter().take(limit).cloned().collect()
}
