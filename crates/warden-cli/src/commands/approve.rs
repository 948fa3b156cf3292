//! `approve` (§6): approve or reject a run parked at `awaiting_approval`.

use crate::cli::OutputFormat;
use crate::config::{self, WardenConfig};
use crate::output::print_info;
use std::path::PathBuf;
use warden_core::{Result, WardenError};

pub async fn run(
    config_path: &Option<PathBuf>,
    run_id: &str,
    reject: bool,
    comment: Option<String>,
    approver: Option<String>,
    output: OutputFormat,
) -> Result<()> {
    let warden_config = WardenConfig::load(config_path.as_deref())
        .await
        .map_err(|e| WardenError::Internal(e.to_string()))?;
    let runtime = config::build_runtime(&warden_config)
        .await
        .map_err(|e| WardenError::Internal(e.to_string()))?;

    let id = run_id.parse().map_err(|_| WardenError::RunNotFound(run_id.to_string()))?;
    let approver = config::default_approver(approver);

    let run = if reject {
        runtime.orchestrator.reject_run(id, &approver, comment).await?
    } else {
        runtime.orchestrator.approve_run(id, &approver, comment).await?
    };

    let verb = if reject { "rejected" } else { "approved" };
    print_info(
        output,
        &format!("run {} {verb}", run.id),
        serde_json::json!({"run_id": run.id.to_string(), "status": run.status}),
    );
    Ok(())
}
