//! In-memory `Repository`, guarded by one reader-preferring lock covering
//! every map (§5 — "the in-memory repository is shared and uses one mutex
//! covering all maps"). Grounded on the single-`RwLock<HashMap<...>>`
//! posture already used for `warden-providers::ProviderRegistry` and
//! `warden-agents::AgentRegistry`, widened here to cover definitions and
//! runs together since the spec calls for one lock, not one per map.

use crate::repository::{paginate, Repository};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use warden_core::{RunId, RunStatus, StepId, StepRun, Result, WardenError, WorkflowDefinition, WorkflowId, WorkflowRun};

#[derive(Default)]
struct State {
    definitions: HashMap<WorkflowId, WorkflowDefinition>,
    names: HashMap<String, WorkflowId>,
    runs: HashMap<RunId, WorkflowRun>,
}

#[derive(Default)]
pub struct InMemoryRepository {
    state: RwLock<State>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_definition(&self, definition: WorkflowDefinition) -> Result<WorkflowDefinition> {
        let mut state = self.state.write();
        if state.names.contains_key(&definition.name) {
            return Err(WardenError::WorkflowAlreadyExists(definition.name));
        }
        state.names.insert(definition.name.clone(), definition.id);
        state.definitions.insert(definition.id, definition.clone());
        Ok(definition)
    }

    async fn get(&self, id: WorkflowId) -> Result<WorkflowDefinition> {
        self.state
            .read()
            .definitions
            .get(&id)
            .cloned()
            .ok_or_else(|| WardenError::WorkflowNotFound(id.to_string()))
    }

    async fn get_by_name(&self, name: &str) -> Result<WorkflowDefinition> {
        let state = self.state.read();
        let id = state
            .names
            .get(name)
            .ok_or_else(|| WardenError::WorkflowNotFound(name.to_string()))?;
        Ok(state.definitions[id].clone())
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<WorkflowDefinition>> {
        let state = self.state.read();
        let mut defs: Vec<_> = state.definitions.values().cloned().collect();
        defs.sort_by_key(|d| d.created_at);
        Ok(paginate(&defs, limit, offset))
    }

    async fn update(&self, definition: WorkflowDefinition) -> Result<WorkflowDefinition> {
        let mut state = self.state.write();
        if !state.definitions.contains_key(&definition.id) {
            return Err(WardenError::WorkflowNotFound(definition.id.to_string()));
        }
        state.names.insert(definition.name.clone(), definition.id);
        state.definitions.insert(definition.id, definition.clone());
        Ok(definition)
    }

    async fn delete(&self, id: WorkflowId) -> Result<()> {
        let mut state = self.state.write();
        let def = state
            .definitions
            .remove(&id)
            .ok_or_else(|| WardenError::WorkflowNotFound(id.to_string()))?;
        state.names.remove(&def.name);
        Ok(())
    }

    async fn create_run(&self, run: WorkflowRun) -> Result<WorkflowRun> {
        let mut state = self.state.write();
        state.runs.insert(run.id, run.clone());
        Ok(run)
    }

    async fn get_run(&self, id: RunId) -> Result<WorkflowRun> {
        self.state
            .read()
            .runs
            .get(&id)
            .cloned()
            .ok_or_else(|| WardenError::RunNotFound(id.to_string()))
    }

    async fn list_runs(&self, workflow_id: WorkflowId, limit: usize, offset: usize) -> Result<Vec<WorkflowRun>> {
        let state = self.state.read();
        let mut runs: Vec<_> = state
            .runs
            .values()
            .filter(|r| r.workflow_id == workflow_id)
            .cloned()
            .collect();
        runs.sort_by_key(|r| r.created_at);
        Ok(paginate(&runs, limit, offset))
    }

    async fn list_active_runs(&self) -> Result<Vec<WorkflowRun>> {
        let state = self.state.read();
        let mut runs: Vec<_> = state
            .runs
            .values()
            .filter(|r| !r.status.is_terminal())
            .cloned()
            .collect();
        runs.sort_by_key(|r| r.created_at);
        Ok(runs)
    }

    async fn update_run(&self, run: WorkflowRun) -> Result<WorkflowRun> {
        let mut state = self.state.write();
        if !state.runs.contains_key(&run.id) {
            return Err(WardenError::RunNotFound(run.id.to_string()));
        }
        state.runs.insert(run.id, run.clone());
        Ok(run)
    }

    async fn get_step(&self, run_id: RunId, step_id: StepId) -> Result<StepRun> {
        let state = self.state.read();
        let run = state
            .runs
            .get(&run_id)
            .ok_or_else(|| WardenError::RunNotFound(run_id.to_string()))?;
        run.steps
            .iter()
            .find(|s| s.id == step_id)
            .cloned()
            .ok_or_else(|| WardenError::StepNotFound(step_id.to_string()))
    }

    async fn update_step(&self, run_id: RunId, step: StepRun) -> Result<StepRun> {
        let mut state = self.state.write();
        let run = state
            .runs
            .get_mut(&run_id)
            .ok_or_else(|| WardenError::RunNotFound(run_id.to_string()))?;
        let slot = run
            .steps
            .iter_mut()
            .find(|s| s.id == step.id)
            .ok_or_else(|| WardenError::StepNotFound(step.id.to_string()))?;
        *slot = step.clone();
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;
    use warden_core::StepDefinition;

    fn definition(name: &str) -> WorkflowDefinition {
        WorkflowDefinition::new(
            name,
            "1.0",
            "d",
            vec![StepDefinition::new("only", "echo-agent")],
            vec![],
            vec![],
            Map::new(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn create_then_get_and_get_by_name() {
        let repo = InMemoryRepository::new();
        let def = repo.create_definition(definition("wf")).await.unwrap();
        assert_eq!(repo.get(def.id).await.unwrap().name, "wf");
        assert_eq!(repo.get_by_name("wf").await.unwrap().id, def.id);
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let repo = InMemoryRepository::new();
        repo.create_definition(definition("wf")).await.unwrap();
        let err = repo.create_definition(definition("wf")).await.unwrap_err();
        assert!(matches!(err, WardenError::WorkflowAlreadyExists(_)));
    }

    #[tokio::test]
    async fn unknown_workflow_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo.get(WorkflowId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn list_pagination_clamps_and_empties_past_the_end() {
        let repo = InMemoryRepository::new();
        for i in 0..5 {
            repo.create_definition(definition(&format!("wf{i}"))).await.unwrap();
        }
        assert_eq!(repo.list(2, 3).await.unwrap().len(), 2);
        assert!(repo.list(10, 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_run_then_get_and_update_step() {
        let repo = InMemoryRepository::new();
        let def = repo.create_definition(definition("wf")).await.unwrap();
        let run = WorkflowRun::new(&def, "manual", serde_json::json!({}));
        let run_id = run.id;
        let step_id = run.steps[0].id;
        repo.create_run(run).await.unwrap();

        let mut step = repo.get_step(run_id, step_id).await.unwrap();
        step.start();
        repo.update_step(run_id, step).await.unwrap();

        let reloaded = repo.get_run(run_id).await.unwrap();
        assert_eq!(reloaded.steps[0].status, warden_core::StepStatus::Running);
    }

    #[tokio::test]
    async fn list_active_runs_excludes_terminal_runs() {
        let repo = InMemoryRepository::new();
        let def = repo.create_definition(definition("wf")).await.unwrap();
        let mut active = WorkflowRun::new(&def, "manual", serde_json::json!({}));
        let mut done = WorkflowRun::new(&def, "manual", serde_json::json!({}));
        done.complete();
        repo.create_run(active.clone()).await.unwrap();
        repo.create_run(done).await.unwrap();

        let listed = repo.list_active_runs().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, active.id);
        active.complete();
    }

    #[tokio::test]
    async fn update_run_on_unknown_run_is_not_found() {
        let repo = InMemoryRepository::new();
        let def = definition("wf");
        let run = WorkflowRun::new(&def, "manual", serde_json::json!({}));
        let err = repo.update_run(run).await.unwrap_err();
        assert!(matches!(err, WardenError::RunNotFound(_)));
    }
}
