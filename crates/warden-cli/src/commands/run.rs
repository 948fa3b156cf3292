//! `run` (§6): parse a workflow file, create a run, execute it to
//! completion, the approval gate, or failure.

use crate::cli::OutputFormat;
use crate::config::{self, WardenConfig};
use crate::output::print_info;
use std::path::{Path, PathBuf};
use warden_core::{CancelContext, Result, WardenError, WorkflowDefinitionConfig};

pub async fn run(
    config_path: &Option<PathBuf>,
    workflow: &Path,
    dry_run: bool,
    inputs: Vec<(String, String)>,
    wait: bool,
    output: OutputFormat,
) -> Result<()> {
    let text = tokio::fs::read_to_string(workflow)
        .await
        .map_err(|e| WardenError::WorkflowInvalid(format!("reading {}: {e}", workflow.display())))?;
    let definition = WorkflowDefinitionConfig::from_yaml(&text)?.into_definition()?;

    if dry_run {
        print_info(
            output,
            "workflow is well-formed (dry run, no run created)",
            serde_json::json!({"workflow_id": definition.id.to_string(), "steps": definition.step_names()}),
        );
        return Ok(());
    }

    let warden_config = WardenConfig::load(config_path.as_deref())
        .await
        .map_err(|e| WardenError::Internal(e.to_string()))?;
    let runtime = config::build_runtime(&warden_config)
        .await
        .map_err(|e| WardenError::Internal(e.to_string()))?;

    let definition = runtime.orchestrator.create_workflow(definition).await?;

    let mut trigger_data = serde_json::Map::new();
    for (key, value) in inputs {
        trigger_data.insert(key, serde_json::Value::String(value));
    }
    let run = runtime
        .orchestrator
        .create_run(&definition, "cli", serde_json::Value::Object(trigger_data))
        .await?;
    let run_id = run.id;

    // `--wait` has no further effect beyond what `execute_workflow` already
    // does: this CLI has no daemon to keep polling against after the
    // process exits, so a run either finishes, fails, or parks at
    // `awaiting_approval` within this same invocation.
    let _ = wait;
    let cancel = CancelContext::new();
    match runtime.orchestrator.execute_workflow(run, &definition, &cancel).await {
        Ok(completed) => {
            print_info(
                output,
                "run completed",
                serde_json::json!({"run_id": completed.id.to_string(), "status": "completed"}),
            );
            Ok(())
        }
        Err(WardenError::ApprovalRequired) => {
            print_info(
                output,
                &format!("run {run_id} is awaiting approval"),
                serde_json::json!({"run_id": run_id.to_string(), "status": "awaiting_approval"}),
            );
            Ok(())
        }
        Err(err) => Err(err),
    }
}
