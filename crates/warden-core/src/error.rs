//! Error taxonomy for the workflow runtime.
//!
//! Kinds are grouped the way §7 of the governing spec groups them — domain,
//! governance, external, validation — but are expressed as one flat enum so
//! `?` composes across layers without constant wrapping. `is_transient` and
//! `is_not_found` classify across wrapping via [`WardenError::root_cause`].

use thiserror::Error;

/// A single `{field, message}` validation failure.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Comprehensive error enum for all Warden operations.
#[derive(Debug, Error)]
pub enum WardenError {
    // --- Domain ---
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),
    #[error("workflow already exists: {0}")]
    WorkflowAlreadyExists(String),
    #[error("workflow invalid: {0}")]
    WorkflowInvalid(String),
    #[error("run not found: {0}")]
    RunNotFound(String),
    #[error("run already started: {0}")]
    RunAlreadyStarted(String),
    #[error("run already completed: {0}")]
    RunCompleted(String),
    #[error("run cancelled: {0}")]
    RunCancelled(String),
    #[error("step not found: {0}")]
    StepNotFound(String),
    #[error("step failed: {0}")]
    StepFailed(String),
    #[error("step timed out: {0}")]
    StepTimeout(String),

    // --- Governance ---
    #[error("policy not found: {0}")]
    PolicyNotFound(String),
    #[error("policy invalid: {0}")]
    PolicyInvalid(String),
    #[error("policy violation: {0}")]
    PolicyViolation(String),
    #[error("approval not found: {0}")]
    ApprovalNotFound(String),
    /// A signal, not a fault: the caller should branch on this variant
    /// rather than treat it as a failure.
    #[error("approval required")]
    ApprovalRequired,
    #[error("approval rejected: {0}")]
    ApprovalRejected(String),
    #[error("approval expired: {0}")]
    ApprovalExpired(String),
    #[error("approval pending: {0}")]
    ApprovalPending(String),

    // --- External ---
    #[error("agent not found: {0}")]
    AgentNotFound(String),
    #[error("agent unavailable: {0}")]
    AgentUnavailable(String),
    #[error("agent timed out: {0}")]
    AgentTimeout(String),
    #[error("llm provider not found: {0}")]
    LlmProviderNotFound(String),
    #[error("llm rate limited: {0}")]
    LlmRateLimited(String),
    #[error("llm context too long: {0}")]
    LlmContextTooLong(String),
    #[error("circuit open: {0}")]
    CircuitOpen(String),

    // --- Validation ---
    #[error("validation failed: {0:?}")]
    Validation(Vec<FieldError>),

    // --- Cross-cutting ---
    #[error("operation cancelled")]
    Cancelled,
    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Wrapped(#[from] Box<WardenError>),
}

impl WardenError {
    /// Unwrap any `Wrapped` indirection to reach the originating variant.
    fn root_cause(&self) -> &WardenError {
        match self {
            WardenError::Wrapped(inner) => inner.root_cause(),
            other => other,
        }
    }

    /// `IsTransient` (§7): retryable-by-nature external failures.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self.root_cause(),
            WardenError::AgentTimeout(_)
                | WardenError::LlmRateLimited(_)
                | WardenError::AgentUnavailable(_)
        )
    }

    /// `IsNotFound` (§7).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root_cause(),
            WardenError::WorkflowNotFound(_)
                | WardenError::RunNotFound(_)
                | WardenError::StepNotFound(_)
                | WardenError::PolicyNotFound(_)
                | WardenError::ApprovalNotFound(_)
                | WardenError::AgentNotFound(_)
        )
    }

    /// True for the terminal-but-not-a-bug "approval required" signal.
    #[must_use]
    pub fn is_approval_required(&self) -> bool {
        matches!(self.root_cause(), WardenError::ApprovalRequired)
    }
}

pub type Result<T> = std::result::Result<T, WardenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_classified() {
        assert!(WardenError::AgentTimeout("x".into()).is_transient());
        assert!(WardenError::LlmRateLimited("x".into()).is_transient());
        assert!(WardenError::AgentUnavailable("x".into()).is_transient());
        assert!(!WardenError::StepFailed("x".into()).is_transient());
    }

    #[test]
    fn not_found_errors_are_classified() {
        assert!(WardenError::RunNotFound("x".into()).is_not_found());
        assert!(WardenError::AgentNotFound("x".into()).is_not_found());
        assert!(!WardenError::StepFailed("x".into()).is_not_found());
    }

    #[test]
    fn classification_looks_through_wrapping() {
        let wrapped = WardenError::Wrapped(Box::new(WardenError::RunNotFound("r1".into())));
        assert!(wrapped.is_not_found());
        assert!(!wrapped.is_transient());
    }

    #[test]
    fn approval_required_is_a_signal_not_a_fault() {
        assert!(WardenError::ApprovalRequired.is_approval_required());
        assert!(!WardenError::ApprovalRequired.is_transient());
        assert!(!WardenError::ApprovalRequired.is_not_found());
    }
}
