//! Policy data shapes (§3, §4.6). Evaluation lives in the `warden-policy`
//! crate; this crate only defines the types the evaluator and the rest of
//! the runtime share.

use crate::ids::PolicyBundleId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Error/critical severities block the run; info/warning only warn.
    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        matches!(self, Self::Error | Self::Critical)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    pub name: String,
    pub enabled: bool,
    /// Opaque rule source text — the evaluator's declarative rule language,
    /// treated as data here (§4.6, §9).
    pub source: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyBundle {
    pub id: PolicyBundleId,
    pub name: String,
    pub version: String,
    pub description: String,
    pub rules: Vec<PolicyRule>,
    pub active: bool,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PolicyBundle {
    #[must_use]
    pub fn enabled_rules(&self) -> impl Iterator<Item = &PolicyRule> {
        self.rules.iter().filter(|r| r.enabled)
    }
}

/// The canonical record rules are evaluated against (§3).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PolicyInput {
    pub workflow_id: String,
    pub workflow_name: String,
    pub run_id: String,
    pub step_name: String,
    pub agent_id: String,
    pub agent_name: String,
    pub capabilities: Vec<String>,
    pub context: HashMap<String, serde_json::Value>,
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyViolation {
    pub rule_name: String,
    pub message: String,
    pub severity: Severity,
    pub details: HashMap<String, serde_json::Value>,
}

/// The result of evaluating one or more rule bundles against a
/// [`PolicyInput`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyResult {
    pub allowed: bool,
    pub requires_approval: bool,
    pub violations: Vec<PolicyViolation>,
    pub warnings: Vec<PolicyViolation>,
}

impl Default for PolicyResult {
    fn default() -> Self {
        Self {
            allowed: true,
            requires_approval: false,
            violations: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl PolicyResult {
    /// `IsBlocking ⇔ ¬allowed ∨ any violation has severity ∈ {error,
    /// critical}` (§3).
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        !self.allowed || self.violations.iter().any(|v| v.severity.is_blocking())
    }

    /// Files a rule-level violation onto `violations` or `warnings`
    /// depending on its severity (§4.6).
    pub fn record_violation(&mut self, violation: PolicyViolation) {
        if violation.severity.is_blocking() {
            self.violations.push(violation);
        } else {
            self.warnings.push(violation);
        }
    }

    /// AND-fold `allowed`, OR-fold `requires_approval`, concatenate the
    /// lists — the monotone merge rule used both within a bundle and across
    /// `EvaluateAll` (§4.6).
    #[must_use]
    pub fn merge(mut self, other: PolicyResult) -> PolicyResult {
        self.allowed = self.allowed && other.allowed;
        self.requires_approval = self.requires_approval || other.requires_approval;
        self.violations.extend(other.violations);
        self.warnings.extend(other.warnings);
        self
    }

    #[must_use]
    pub fn joined_violation_messages(&self) -> String {
        self.violations
            .iter()
            .map(|v| v.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
