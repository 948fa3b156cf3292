//! The YAML-facing shape of a workflow definition (§6): what `warden-cli`
//! parses a workflow file into. Kept in this crate, not the CLI, so the
//! orchestrator and repository never depend on YAML parsing directly — only
//! on the resulting [`WorkflowDefinition`].

use crate::error::WardenError;
use crate::ids::PolicyBundleId;
use crate::workflow::{StepDefinition, Trigger, WorkflowDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

fn default_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    pub name: String,
    pub agent: String,
    #[serde(default)]
    pub input: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retries: u32,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl From<StepConfig> for StepDefinition {
    fn from(c: StepConfig) -> Self {
        Self {
            name: c.name,
            agent: c.agent,
            input: c.input,
            output: c.output,
            requires_approval: c.requires_approval,
            timeout: Duration::from_secs(c.timeout_secs),
            retries: c.retries,
            condition: c.condition,
            depends_on: c.depends_on,
        }
    }
}

/// The file format of `--workflow=<path>` (§6): `name, version, description,
/// triggers[], steps[], policies[], metadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinitionConfig {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    pub steps: Vec<StepConfig>,
    /// Referenced by bundle id (canonical UUID string); bundles themselves
    /// are loaded and activated separately (§4.6).
    #[serde(default)]
    pub policies: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl WorkflowDefinitionConfig {
    /// Parse from YAML text (the format `init`/`run --workflow=` read).
    pub fn from_yaml(text: &str) -> Result<Self, WardenError> {
        serde_yaml::from_str(text)
            .map_err(|e| WardenError::WorkflowInvalid(format!("malformed workflow file: {e}")))
    }

    /// Resolve into a persistable, validated [`WorkflowDefinition`] (§3's
    /// invariants are enforced by [`WorkflowDefinition::new`]).
    pub fn into_definition(self) -> Result<WorkflowDefinition, WardenError> {
        let policies = self
            .policies
            .iter()
            .map(|raw| {
                raw.parse::<PolicyBundleId>()
                    .map_err(|_| WardenError::PolicyInvalid(format!("invalid policy bundle id '{raw}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let steps = self.steps.into_iter().map(StepDefinition::from).collect();
        WorkflowDefinition::new(
            self.name,
            self.version,
            self.description,
            steps,
            self.triggers,
            policies,
            self.metadata,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = r#"
name: pr-review
version: "1.0"
description: reviews a pull request
triggers:
  - kind: manual
steps:
  - name: fetch-diff
    agent: differ
  - name: review
    agent: reviewer
    depends_on: ["fetch-diff"]
    requires_approval: true
    timeout_secs: 120
    retries: 2
"#;

    #[test]
    fn parses_and_resolves_a_well_formed_workflow_file() {
        let config = WorkflowDefinitionConfig::from_yaml(BASIC).unwrap();
        let def = config.into_definition().unwrap();
        assert_eq!(def.step_names(), vec!["fetch-diff", "review"]);
        assert_eq!(def.steps[1].timeout, Duration::from_secs(120));
        assert!(def.steps[1].requires_approval);
    }

    #[test]
    fn malformed_yaml_is_reported_as_workflow_invalid() {
        let err = WorkflowDefinitionConfig::from_yaml("not: [valid").unwrap_err();
        assert!(matches!(err, WardenError::WorkflowInvalid(_)));
    }

    #[test]
    fn unknown_policy_id_fails_resolution() {
        let mut config = WorkflowDefinitionConfig::from_yaml(BASIC).unwrap();
        config.policies.push("not-a-uuid".to_string());
        let err = config.into_definition().unwrap_err();
        assert!(matches!(err, WardenError::PolicyInvalid(_)));
    }
}
