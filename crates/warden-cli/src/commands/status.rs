//! `status` (§6): show one run by id, or list active runs with `--all`.

use crate::cli::OutputFormat;
use crate::config::{self, WardenConfig};
use std::path::PathBuf;
use std::time::Duration;
use warden_core::{Result, WardenError, WorkflowRun};

pub async fn run(
    config_path: &Option<PathBuf>,
    run_id: Option<String>,
    all: bool,
    watch: bool,
    output: OutputFormat,
) -> Result<()> {
    let warden_config = WardenConfig::load(config_path.as_deref())
        .await
        .map_err(|e| WardenError::Internal(e.to_string()))?;
    let runtime = config::build_runtime(&warden_config)
        .await
        .map_err(|e| WardenError::Internal(e.to_string()))?;

    if all {
        let runs = runtime.orchestrator.list_active_runs().await?;
        print_runs(&runs, output);
        return Ok(());
    }

    let raw = run_id.ok_or_else(|| WardenError::Internal("RUN_ID is required unless --all is given".to_string()))?;
    let id = raw
        .parse()
        .map_err(|_| WardenError::RunNotFound(raw.clone()))?;

    loop {
        let run = runtime.orchestrator.get_run(id).await?;
        let terminal = run.status.is_terminal();
        print_run(&run, output);
        if !watch || terminal {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
}

fn print_runs(runs: &[WorkflowRun], output: OutputFormat) {
    match output {
        OutputFormat::Json => {
            let body: Vec<_> = runs.iter().map(run_json).collect();
            println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
        }
        OutputFormat::Text => {
            if runs.is_empty() {
                println!("No active runs.");
                return;
            }
            for run in runs {
                println!("{}  {}  {:?}", run.id, run.workflow_name, run.status);
            }
        }
    }
}

fn print_run(run: &WorkflowRun, output: OutputFormat) {
    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&run_json(run)).unwrap_or_default());
        }
        OutputFormat::Text => {
            println!("Run {}", run.id);
            println!("  Workflow: {} v{}", run.workflow_name, run.workflow_version);
            println!("  Status:   {:?}", run.status);
            println!("  Step:     {}/{}", run.current_step_index, run.steps.len());
            for step in &run.steps {
                println!("    [{:?}] {}", step.status, step.name);
            }
            if let Some(err) = &run.error {
                println!("  Error:    {err}");
            }
        }
    }
}

fn run_json(run: &WorkflowRun) -> serde_json::Value {
    serde_json::json!({
        "run_id": run.id.to_string(),
        "workflow_name": run.workflow_name,
        "workflow_version": run.workflow_version,
        "status": run.status,
        "current_step_index": run.current_step_index,
        "steps": run.steps.iter().map(|s| serde_json::json!({
            "name": s.name,
            "status": s.status,
            "error": s.error,
        })).collect::<Vec<_>>(),
        "error": run.error,
    })
}
