//! `validate` (§6): parse a workflow file and report structural errors
//! without creating a run. Warnings are advisory unless `--strict`
//! promotes them to errors.

use crate::cli::OutputFormat;
use std::path::Path;
use warden_core::{Result, WardenError, WorkflowDefinitionConfig};

pub async fn run(workflow: &Path, strict: bool, output: OutputFormat) -> Result<()> {
    let text = tokio::fs::read_to_string(workflow)
        .await
        .map_err(|e| WardenError::WorkflowInvalid(format!("reading {}: {e}", workflow.display())))?;

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let parsed = WorkflowDefinitionConfig::from_yaml(&text);
    let definition = match parsed {
        Ok(config) => {
            if config.policies.is_empty() {
                warnings.push("no policy bundles referenced; the run will be ungoverned".to_string());
            }
            if config.triggers.is_empty() {
                warnings.push("no triggers declared".to_string());
            }
            match config.into_definition() {
                Ok(def) => Some(def),
                Err(e) => {
                    errors.push(e.to_string());
                    None
                }
            }
        }
        Err(e) => {
            errors.push(e.to_string());
            None
        }
    };

    if strict {
        errors.append(&mut warnings);
    }

    let valid = errors.is_empty();
    let path = workflow.display().to_string();

    match output {
        OutputFormat::Json => {
            let body = serde_json::json!({
                "valid": valid,
                "path": path,
                "warnings": warnings,
                "errors": errors,
            });
            println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
        }
        OutputFormat::Text => {
            println!("Workflow validation:");
            println!("  File: {path}");
            println!("  Status: {}", if valid { "✓ Valid" } else { "✗ Invalid" });
            if let Some(def) = &definition {
                println!("  Steps: {}", def.step_names().join(", "));
            }
            if !warnings.is_empty() {
                println!("\nWarnings:");
                for warning in &warnings {
                    println!("  ⚠ {warning}");
                }
            }
            if !errors.is_empty() {
                println!("\nErrors:");
                for error in &errors {
                    println!("  ✗ {error}");
                }
            }
        }
    }

    if valid {
        Ok(())
    } else {
        Err(WardenError::WorkflowInvalid(errors.join("; ")))
    }
}
