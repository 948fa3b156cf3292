//! `init` (§6): scaffold a config file and an example workflow definition.

use crate::cli::{OutputFormat, Template};
use crate::output::print_info;
use std::path::Path;
use warden_core::{Result, WardenError};

const BASIC_WORKFLOW: &str = r#"name: example-workflow
version: "1.0"
description: a minimal one-step workflow
triggers:
  - kind: manual
steps:
  - name: greet
    agent: echo-agent
"#;

const PR_REVIEW_WORKFLOW: &str = r#"name: pr-review
version: "1.0"
description: fetches a pull request diff and reviews it
triggers:
  - kind: repository_event
    event: pull_request.opened
steps:
  - name: fetch-diff
    agent: differ
  - name: review
    agent: reviewer
    depends_on: ["fetch-diff"]
    requires_approval: true
    timeout_secs: 300
    retries: 2
"#;

pub async fn run(template: Template, force: bool, output: OutputFormat) -> Result<()> {
    let workflow_path = Path::new("workflow.yaml");
    let config_path = Path::new("warden.toml");

    if !force {
        for path in [workflow_path, config_path] {
            if path.exists() {
                return Err(WardenError::Internal(format!(
                    "{} already exists; pass --force to overwrite",
                    path.display()
                )));
            }
        }
    }

    let workflow_text = match template {
        Template::Basic => BASIC_WORKFLOW,
        Template::PrReview => PR_REVIEW_WORKFLOW,
    };

    tokio::fs::write(workflow_path, workflow_text)
        .await
        .map_err(|e| WardenError::Internal(format!("writing {}: {e}", workflow_path.display())))?;
    tokio::fs::write(config_path, "# warden.toml\n\n[[agents]]\n")
        .await
        .map_err(|e| WardenError::Internal(format!("writing {}: {e}", config_path.display())))?;

    print_info(
        output,
        "scaffolded warden.toml and workflow.yaml",
        serde_json::json!({
            "workflow": workflow_path.display().to_string(),
            "config": config_path.display().to_string(),
        }),
    );
    Ok(())
}
