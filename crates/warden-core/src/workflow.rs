//! `WorkflowDefinition` and `StepDefinition` — the immutable template a
//! [`crate::run::WorkflowRun`] is instantiated from.

use crate::error::{FieldError, WardenError};
use crate::ids::{PolicyBundleId, WorkflowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;

/// How a run of this definition can be started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    Manual,
    RepositoryEvent { event: String },
    Scheduled { cron: String },
}

/// One step in a [`WorkflowDefinition`]. Immutable once the definition is
/// created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    /// Logical agent identifier, resolved against the agent registry at run
    /// time — not a foreign key into any persisted agent table.
    pub agent: String,
    /// May contain `${{ trigger.<path> }}` / `${{ steps.<name>.output(.<path>)? }}`
    /// template references; resolution is the configuration layer's job.
    pub input: HashMap<String, serde_json::Value>,
    pub output: Option<String>,
    pub requires_approval: bool,
    #[serde(with = "humantime_duration")]
    pub timeout: Duration,
    pub retries: u32,
    pub condition: Option<String>,
    pub depends_on: Vec<String>,
}

impl StepDefinition {
    pub fn new(name: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            agent: agent.into(),
            input: HashMap::new(),
            output: None,
            requires_approval: false,
            timeout: Duration::from_secs(5 * 60),
            retries: 0,
            condition: None,
            depends_on: Vec::new(),
        }
    }
}

/// Serializes a `Duration` as whole seconds — avoids pulling in a duration
/// crate just for this one field.
mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

/// A template workflows are run from. Created once; immutable apart from
/// `updated_at` bumps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: WorkflowId,
    pub name: String,
    pub version: String,
    pub description: String,
    pub steps: Vec<StepDefinition>,
    pub triggers: Vec<Trigger>,
    pub policies: Vec<PolicyBundleId>,
    pub checksum: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowDefinition {
    /// Construct and validate a new definition. Fails with
    /// `WardenError::Validation` (field-level) if any invariant in §3 is
    /// violated.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
        steps: Vec<StepDefinition>,
        triggers: Vec<Trigger>,
        policies: Vec<PolicyBundleId>,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<Self, WardenError> {
        let name = name.into();
        let version = version.into();
        let description = description.into();

        let mut def = Self {
            id: WorkflowId::new(),
            name,
            version,
            description,
            steps,
            triggers,
            policies,
            checksum: String::new(),
            metadata,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        def.validate()?;
        def.checksum = def.compute_checksum();
        Ok(def)
    }

    /// Validate the invariants from spec §3: non-empty name/version, at
    /// least one step, unique step names, and `depends_on` references that
    /// resolve to an earlier step.
    pub fn validate(&self) -> Result<(), WardenError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "must not be empty"));
        }
        if self.version.trim().is_empty() {
            errors.push(FieldError::new("version", "must not be empty"));
        }
        if self.steps.is_empty() {
            errors.push(FieldError::new("steps", "must contain at least one step"));
        }

        let mut seen = HashMap::new();
        for (idx, step) in self.steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                errors.push(FieldError::new(
                    format!("steps[{idx}].name"),
                    "must not be empty",
                ));
                continue;
            }
            if step.agent.trim().is_empty() {
                errors.push(FieldError::new(
                    format!("steps[{idx}].agent"),
                    "step must declare an agent",
                ));
            }
            if seen.insert(step.name.clone(), idx).is_some() {
                errors.push(FieldError::new(
                    format!("steps[{idx}].name"),
                    format!("duplicate step name '{}'", step.name),
                ));
            }
        }

        for (idx, step) in self.steps.iter().enumerate() {
            for dep in &step.depends_on {
                match seen.get(dep) {
                    Some(&dep_idx) if dep_idx < idx => {}
                    Some(_) => errors.push(FieldError::new(
                        format!("steps[{idx}].depends_on"),
                        format!("'{dep}' does not precede '{}'", step.name),
                    )),
                    None => errors.push(FieldError::new(
                        format!("steps[{idx}].depends_on"),
                        format!("unknown step '{dep}'"),
                    )),
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(WardenError::Validation(errors))
        }
    }

    /// Content checksum over the canonical form of the definition — used to
    /// detect drift between a persisted definition and the YAML it was
    /// parsed from.
    #[must_use]
    pub fn compute_checksum(&self) -> String {
        let canonical = serde_json::json!({
            "name": self.name,
            "version": self.version,
            "steps": self.steps,
            "triggers": self.triggers,
            "policies": self.policies,
        });
        let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
        let digest = Sha256::digest(&bytes);
        hex::encode(digest)
    }

    #[must_use]
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(names: &[&str]) -> Vec<StepDefinition> {
        names
            .iter()
            .map(|n| StepDefinition::new(*n, "echo-agent"))
            .collect()
    }

    #[test]
    fn rejects_empty_name_or_version() {
        let err = WorkflowDefinition::new(
            "",
            "1.0",
            "d",
            steps(&["a"]),
            vec![],
            vec![],
            HashMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, WardenError::Validation(_)));
    }

    #[test]
    fn rejects_empty_step_list() {
        let err =
            WorkflowDefinition::new("wf", "1.0", "d", vec![], vec![], vec![], HashMap::new())
                .unwrap_err();
        assert!(matches!(err, WardenError::Validation(_)));
    }

    #[test]
    fn rejects_duplicate_step_names() {
        let err = WorkflowDefinition::new(
            "wf",
            "1.0",
            "d",
            steps(&["a", "a"]),
            vec![],
            vec![],
            HashMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, WardenError::Validation(_)));
    }

    #[test]
    fn rejects_forward_or_unknown_depends_on() {
        let mut s = steps(&["a", "b"]);
        s[0].depends_on = vec!["b".to_string()]; // forward reference
        let err =
            WorkflowDefinition::new("wf", "1.0", "d", s, vec![], vec![], HashMap::new())
                .unwrap_err();
        assert!(matches!(err, WardenError::Validation(_)));

        let mut s2 = steps(&["a", "b"]);
        s2[1].depends_on = vec!["nope".to_string()];
        let err2 =
            WorkflowDefinition::new("wf", "1.0", "d", s2, vec![], vec![], HashMap::new())
                .unwrap_err();
        assert!(matches!(err2, WardenError::Validation(_)));
    }

    #[test]
    fn accepts_a_valid_definition_and_computes_a_checksum() {
        let mut s = steps(&["a", "b"]);
        s[1].depends_on = vec!["a".to_string()];
        let def =
            WorkflowDefinition::new("wf", "1.0", "d", s, vec![Trigger::Manual], vec![], HashMap::new())
                .unwrap();
        assert_eq!(def.checksum.len(), 64);
        assert_eq!(def.step_names(), vec!["a", "b"]);
    }

    #[test]
    fn checksum_is_stable_for_identical_content() {
        let def1 = WorkflowDefinition::new(
            "wf",
            "1.0",
            "d",
            steps(&["a"]),
            vec![],
            vec![],
            HashMap::new(),
        )
        .unwrap();
        let def2 = WorkflowDefinition::new(
            "wf",
            "1.0",
            "d",
            steps(&["a"]),
            vec![],
            vec![],
            HashMap::new(),
        )
        .unwrap();
        assert_eq!(def1.checksum, def2.checksum);
    }
}
