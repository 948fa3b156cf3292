//! The policy evaluator (§4.6): folds a bundle's enabled rules, and folds
//! across all active bundles for `evaluate_all`.

use crate::rule::RuleExpr;
use tracing::warn;
use warden_core::{PolicyBundle, PolicyInput, PolicyResult, PolicyViolation, Severity};

/// Evaluate a single bundle. Disabled rules contribute nothing (§3); a rule
/// whose `source` fails to parse is logged and skipped — it never changes
/// `allowed` (§4.6 failure mode).
#[must_use]
pub fn evaluate_bundle(bundle: &PolicyBundle, input: &PolicyInput) -> PolicyResult {
    let mut result = PolicyResult::default();

    for rule in bundle.enabled_rules() {
        let Some(expr) = RuleExpr::parse(&rule.source) else {
            warn!(
                bundle = %bundle.name,
                rule = %rule.name,
                "policy rule failed to parse; skipping"
            );
            continue;
        };

        let outcome = expr.evaluate(input);
        result.allowed = result.allowed && outcome.allowed;
        result.requires_approval = result.requires_approval || outcome.requires_approval;

        for message in outcome.violations {
            result.record_violation(PolicyViolation {
                rule_name: rule.name.clone(),
                message,
                severity: rule.severity,
                details: Default::default(),
            });
        }
    }

    result
}

/// Evaluate every active bundle and fold the results with the same
/// AND/OR-monotone rule used within a single bundle (§4.6). Inactive
/// bundles are skipped entirely.
#[must_use]
pub fn evaluate_all<'a>(
    bundles: impl IntoIterator<Item = &'a PolicyBundle>,
    input: &PolicyInput,
) -> PolicyResult {
    bundles
        .into_iter()
        .filter(|b| b.active)
        .map(|b| evaluate_bundle(b, input))
        .fold(PolicyResult::default(), PolicyResult::merge)
}

/// A bundle-level syntax check: every enabled rule's `source` must parse.
/// Mirrors spec §4.6's `ValidateRego`-equivalent, generalized to this
/// crate's JSON rule language.
pub fn validate_bundle(bundle: &PolicyBundle) -> Result<(), warden_core::WardenError> {
    for rule in bundle.enabled_rules() {
        if RuleExpr::parse(&rule.source).is_none() {
            return Err(warden_core::WardenError::PolicyInvalid(format!(
                "rule '{}' in bundle '{}' is malformed",
                rule.name, bundle.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use warden_core::{PolicyBundleId, PolicyRule};

    fn bundle(rules: Vec<PolicyRule>, active: bool) -> PolicyBundle {
        PolicyBundle {
            id: PolicyBundleId::new(),
            name: "b".into(),
            version: "1".into(),
            description: "d".into(),
            rules,
            active,
            checksum: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn deny_env_rule() -> PolicyRule {
        PolicyRule {
            name: "deny-env".into(),
            enabled: true,
            severity: Severity::Error,
            source: serde_json::to_string(&serde_json::json!({
                "when": {"op": "context_contains", "path": "context.path", "value": ".env"},
                "deny": true,
                "violation_message": "access to .env files is forbidden",
            }))
            .unwrap(),
        }
    }

    fn input_with_path(path: &str) -> PolicyInput {
        let mut context = HashMap::new();
        context.insert("path".to_string(), serde_json::json!(path));
        PolicyInput {
            context,
            ..PolicyInput::default()
        }
    }

    #[test]
    fn disabled_rule_contributes_nothing_policy_monotonicity() {
        let mut disabled_rule = deny_env_rule();
        disabled_rule.enabled = false;

        let without = evaluate_bundle(&bundle(vec![], true), &input_with_path(".env.local"));
        let with_disabled =
            evaluate_bundle(&bundle(vec![disabled_rule], true), &input_with_path(".env.local"));

        assert_eq!(without.allowed, with_disabled.allowed);
        assert_eq!(without.violations.len(), with_disabled.violations.len());
    }

    #[test]
    fn s2_policy_block_scenario() {
        let b = bundle(vec![deny_env_rule()], true);
        let result = evaluate_bundle(&b, &input_with_path(".env.local"));
        assert!(!result.allowed);
        assert!(result.is_blocking());
        assert_eq!(result.violations[0].rule_name, "deny-env");
    }

    #[test]
    fn inactive_bundles_are_skipped_by_evaluate_all() {
        let active = bundle(vec![deny_env_rule()], true);
        let inactive = bundle(vec![deny_env_rule()], false);
        let result = evaluate_all([&active, &inactive], &input_with_path("readme.md"));
        assert!(result.allowed);
    }

    #[test]
    fn malformed_rule_is_skipped_not_denied() {
        let bad_rule = PolicyRule {
            name: "broken".into(),
            enabled: true,
            severity: Severity::Critical,
            source: "{not valid json".into(),
        };
        let result = evaluate_bundle(&bundle(vec![bad_rule], true), &PolicyInput::default());
        assert!(result.allowed);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn approval_requirement_is_or_folded() {
        let approval_rule = PolicyRule {
            name: "needs-approval".into(),
            enabled: true,
            severity: Severity::Warning,
            source: serde_json::to_string(&serde_json::json!({
                "when": {"op": "always"},
                "require_approval": true,
            }))
            .unwrap(),
        };
        let b = bundle(vec![approval_rule], true);
        let result = evaluate_bundle(&b, &PolicyInput::default());
        assert!(result.requires_approval);
        assert!(result.allowed);
    }
}
