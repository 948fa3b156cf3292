//! Shared identifiers, error taxonomy, and domain aggregates for the Warden
//! workflow runtime. Every other crate in this workspace depends on this one
//! and on nothing "upward" of it — it has no knowledge of providers, policy
//! evaluation, persistence, or the CLI.

pub mod approval;
pub mod audit;
pub mod cancel;
pub mod config;
pub mod error;
pub mod ids;
pub mod policy;
pub mod run;
pub mod workflow;

pub use approval::{Approval, ApprovalStatus};
pub use audit::{AuditEvent, AuditEventType, AuditFilter};
pub use cancel::CancelContext;
pub use config::{StepConfig, WorkflowDefinitionConfig};
pub use error::{FieldError, Result, WardenError};
pub use ids::{AgentId, ApprovalId, PolicyBundleId, RunId, StepId, WorkflowId};
pub use policy::{PolicyBundle, PolicyInput, PolicyResult, PolicyRule, PolicyViolation, Severity};
pub use run::{StepOutput, StepRun, StepStatus, WorkflowRun, RunStatus};
pub use workflow::{StepDefinition, Trigger, WorkflowDefinition};
