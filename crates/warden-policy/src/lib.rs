//! Declarative policy evaluation (§4.6).
//!
//! A [`warden_core::PolicyBundle`] carries its rules' `source` text opaquely
//! (per §4.6/§9, the spec explicitly defers rule syntax to the
//! implementation); this crate supplies one concrete rule language
//! ([`rule::RuleExpr`]) and the evaluator that folds rule/bundle results
//! into a [`warden_core::PolicyResult`].

pub mod evaluator;
pub mod rule;

pub use evaluator::{evaluate_all, evaluate_bundle, validate_bundle};
pub use rule::{Condition, RuleExpr, RuleOutcome};
