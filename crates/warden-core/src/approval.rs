//! `Approval` — the governance object gating a run at `awaiting_approval`
//! (§3, §4.7).

use crate::ids::{ApprovalId, RunId, WorkflowId};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl ApprovalStatus {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub id: ApprovalId,
    pub run_id: RunId,
    pub workflow_id: WorkflowId,
    pub workflow_name: String,
    pub step_name: String,
    pub status: ApprovalStatus,
    pub allowed_approvers: Vec<String>,
    pub approved_by: Option<String>,
    pub note: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Approval {
    #[must_use]
    pub fn new(
        run_id: RunId,
        workflow_id: WorkflowId,
        workflow_name: impl Into<String>,
        step_name: impl Into<String>,
        allowed_approvers: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ApprovalId::new(),
            run_id,
            workflow_id,
            workflow_name: workflow_name.into(),
            step_name: step_name.into(),
            status: ApprovalStatus::Pending,
            allowed_approvers,
            approved_by: None,
            note: None,
            expires_at: now + ChronoDuration::hours(24),
            created_at: now,
            updated_at: now,
        }
    }

    /// Expiry is inclusive: an approval being resolved at exactly
    /// `expires_at` is treated as already expired (§8 boundary behaviour).
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Approve on behalf of `approver`. Terminal transitions only apply
    /// from `pending`; approving an already-expired pending approval flips
    /// it to `expired` and returns an error instead (§3 invariant).
    ///
    /// Identity is checked here against `allowed_approvers` when that list
    /// is non-empty; an empty list means any approver is accepted. See
    /// `DESIGN.md` open-question #2 for why the run's resume path does not
    /// re-check this itself.
    pub fn approve(
        &mut self,
        approver: &str,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), crate::error::WardenError> {
        if self.status.is_terminal() {
            return Err(crate::error::WardenError::ApprovalPending(format!(
                "approval {} is already {:?}",
                self.id, self.status
            )));
        }
        if self.is_expired_at(now) {
            self.status = ApprovalStatus::Expired;
            self.updated_at = now;
            return Err(crate::error::WardenError::ApprovalExpired(self.id.to_string()));
        }
        if !self.allowed_approvers.is_empty() && !self.allowed_approvers.iter().any(|a| a == approver)
        {
            return Err(crate::error::WardenError::ApprovalRejected(format!(
                "{approver} is not in the approver allow-list"
            )));
        }
        self.status = ApprovalStatus::Approved;
        self.approved_by = Some(approver.to_string());
        self.note = note;
        self.updated_at = now;
        Ok(())
    }

    pub fn reject(&mut self, approver: &str, note: Option<String>, now: DateTime<Utc>) -> Result<(), crate::error::WardenError> {
        if self.status.is_terminal() {
            return Err(crate::error::WardenError::ApprovalPending(format!(
                "approval {} is already {:?}",
                self.id, self.status
            )));
        }
        self.status = ApprovalStatus::Rejected;
        self.approved_by = Some(approver.to_string());
        self.note = note;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approval() -> Approval {
        Approval::new(RunId::new(), WorkflowId::new(), "wf", "step-a", vec![])
    }

    #[test]
    fn approve_succeeds_when_pending_and_not_expired() {
        let mut a = approval();
        a.approve("alice", None, Utc::now()).unwrap();
        assert_eq!(a.status, ApprovalStatus::Approved);
        assert_eq!(a.approved_by.as_deref(), Some("alice"));
    }

    #[test]
    fn approve_at_exactly_expires_at_is_treated_as_expired() {
        let mut a = approval();
        let at_expiry = a.expires_at;
        let err = a.approve("alice", None, at_expiry).unwrap_err();
        assert!(matches!(err, crate::error::WardenError::ApprovalExpired(_)));
        assert_eq!(a.status, ApprovalStatus::Expired);
    }

    #[test]
    fn approval_terminality_blocks_further_transitions() {
        let mut a = approval();
        a.approve("alice", None, Utc::now()).unwrap();
        let err = a.reject("bob", None, Utc::now()).unwrap_err();
        assert!(matches!(err, crate::error::WardenError::ApprovalPending(_)));
        assert_eq!(a.status, ApprovalStatus::Approved);
    }

    #[test]
    fn allow_list_rejects_unlisted_approvers() {
        let mut a = Approval::new(
            RunId::new(),
            WorkflowId::new(),
            "wf",
            "step-a",
            vec!["alice".to_string()],
        );
        let err = a.approve("mallory", None, Utc::now()).unwrap_err();
        assert!(matches!(err, crate::error::WardenError::ApprovalRejected(_)));
        assert_eq!(a.status, ApprovalStatus::Pending);
    }

    #[test]
    fn empty_allow_list_accepts_anyone() {
        let mut a = approval();
        assert!(a.approve("whoever", None, Utc::now()).is_ok());
    }
}
