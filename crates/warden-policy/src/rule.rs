//! The rule language a [`warden_core::PolicyRule::source`] string compiles
//! into: a small JSON predicate tree over a [`warden_core::PolicyInput`],
//! exposing the three query points spec §4.6 requires of any declarative
//! rule language — `allowed`, `requires_approval`, `violation`.
//!
//! The spec treats rule syntax as an implementation detail ("a
//! re-implementation may select any declarative rule engine that supports
//! these three queries" — §9), so this is deliberately simple rather than a
//! full embedded language like Rego.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use warden_core::PolicyInput;

/// A predicate over a [`PolicyInput`]. Paths like `"context.path"` index
/// into the input's string-keyed maps; unknown paths never match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    Always,
    /// True if `context`/`metadata` path's string value contains `value` as
    /// a substring.
    ContextContains { path: String, value: String },
    ContextEquals {
        path: String,
        value: serde_json::Value,
    },
    CapabilityPresent {
        capability: String,
    },
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    #[must_use]
    pub fn evaluate(&self, input: &PolicyInput) -> bool {
        match self {
            Condition::Always => true,
            Condition::ContextContains { path, value } => lookup(input, path)
                .and_then(|v| v.as_str().map(|s| s.contains(value.as_str())))
                .unwrap_or(false),
            Condition::ContextEquals { path, value } => {
                lookup(input, path).map(|v| v == value).unwrap_or(false)
            }
            Condition::CapabilityPresent { capability } => {
                input.capabilities.iter().any(|c| c == capability)
            }
            Condition::All(conds) => conds.iter().all(|c| c.evaluate(input)),
            Condition::Any(conds) => conds.iter().any(|c| c.evaluate(input)),
            Condition::Not(inner) => !inner.evaluate(input),
        }
    }
}

/// Looks up a dotted path rooted at `context.*` or `metadata.*` in the
/// policy input's maps. A bare field name (no dot) is looked up in
/// `context` first, then `metadata`.
fn lookup<'a>(input: &'a PolicyInput, path: &str) -> Option<&'a serde_json::Value> {
    let (root, rest) = path.split_once('.').unwrap_or((path, ""));
    let map: &HashMap<String, serde_json::Value> = match root {
        "context" => &input.context,
        "metadata" => &input.metadata,
        _ => &input.context,
    };
    if rest.is_empty() {
        map.get(root)
    } else {
        map.get(rest)
    }
}

/// A compiled rule body: one `Condition` gating whether the rule "fires",
/// plus what firing produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleExpr {
    #[serde(default = "default_condition")]
    pub when: Condition,
    #[serde(default)]
    pub deny: bool,
    #[serde(default)]
    pub require_approval: bool,
    pub violation_message: Option<String>,
}

fn default_condition() -> Condition {
    Condition::Always
}

/// The per-rule query result (§4.6): `allowed`, `requires_approval`, and
/// any violation messages produced by this single rule.
#[derive(Debug, Clone, Default)]
pub struct RuleOutcome {
    pub allowed: bool,
    pub requires_approval: bool,
    pub violations: Vec<String>,
}

impl RuleExpr {
    /// Parse a rule's opaque `source` text as a `RuleExpr`. Returns `None`
    /// on malformed JSON — callers treat a parse failure as "skip the rule,
    /// log it" per §4.6's failure mode, except where explicit validation is
    /// requested (see `validate`).
    #[must_use]
    pub fn parse(source: &str) -> Option<Self> {
        serde_json::from_str(source).ok()
    }

    /// Evaluate against an input that has already matched `when`. `allowed`
    /// defaults to `true` unless `deny` fires.
    #[must_use]
    pub fn evaluate(&self, input: &PolicyInput) -> RuleOutcome {
        if !self.when.evaluate(input) {
            return RuleOutcome {
                allowed: true,
                ..RuleOutcome::default()
            };
        }
        RuleOutcome {
            allowed: !self.deny,
            requires_approval: self.require_approval,
            violations: self
                .violation_message
                .clone()
                .into_iter()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn input_with_context(key: &str, value: serde_json::Value) -> PolicyInput {
        let mut context = HashMap::new();
        context.insert(key.to_string(), value);
        PolicyInput {
            context,
            ..PolicyInput::default()
        }
    }

    #[test]
    fn always_condition_fires_unconditionally() {
        let rule = RuleExpr {
            when: Condition::Always,
            deny: true,
            require_approval: false,
            violation_message: Some("blocked".into()),
        };
        let outcome = rule.evaluate(&PolicyInput::default());
        assert!(!outcome.allowed);
        assert_eq!(outcome.violations, vec!["blocked".to_string()]);
    }

    #[test]
    fn context_contains_matches_substring() {
        let input = input_with_context("path", serde_json::json!(".env.local"));
        let cond = Condition::ContextContains {
            path: "context.path".into(),
            value: ".env".into(),
        };
        assert!(cond.evaluate(&input));

        let input2 = input_with_context("path", serde_json::json!("readme.md"));
        assert!(!cond.evaluate(&input2));
    }

    #[test]
    fn non_firing_rule_is_fully_permissive() {
        let rule = RuleExpr {
            when: Condition::ContextContains {
                path: "context.path".into(),
                value: ".env".into(),
            },
            deny: true,
            require_approval: true,
            violation_message: Some("nope".into()),
        };
        let input = input_with_context("path", serde_json::json!("readme.md"));
        let outcome = rule.evaluate(&input);
        assert!(outcome.allowed);
        assert!(!outcome.requires_approval);
        assert!(outcome.violations.is_empty());
    }

    #[test]
    fn capability_present_condition() {
        let input = PolicyInput {
            capabilities: vec!["shell-exec".to_string()],
            ..PolicyInput::default()
        };
        let cond = Condition::CapabilityPresent {
            capability: "shell-exec".into(),
        };
        assert!(cond.evaluate(&input));
        assert!(!Condition::CapabilityPresent {
            capability: "file-write".into()
        }
        .evaluate(&input));
    }

    #[test]
    fn malformed_source_fails_to_parse() {
        assert!(RuleExpr::parse("not json").is_none());
    }
}
