//! The run state machine (§4.7): an explicit event-driven interpreter over
//! a state enum richer than the persisted [`warden_core::RunStatus`], which
//! collapses `check_approval`/`check_next`/`step_failed` onto
//! `policy_check`/`executing`. Grounded on the explicit-enum-plus-
//! predicate-methods idiom of `llmspell-agents::lifecycle::state_machine`,
//! narrowed to a pure synchronous transition table since this machine has
//! no hook points or circuit breaker of its own — the orchestrator supplies
//! those around it.

use warden_core::RunStatus;

/// The expanded interpreter state. Only the active interpreter — never the
/// persisted run — sees `CheckApproval`, `CheckNext`, or `StepFailed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Pending,
    PolicyCheck,
    CheckApproval,
    AwaitingApproval,
    Executing,
    CheckNext,
    StepFailed,
    Completed,
    Failed,
    Cancelled,
}

impl RunState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Collapse onto the persisted `RunStatus` (§4.7).
    #[must_use]
    pub const fn to_run_status(self) -> RunStatus {
        match self {
            Self::Pending => RunStatus::Pending,
            Self::PolicyCheck | Self::CheckApproval => RunStatus::PolicyCheck,
            Self::AwaitingApproval => RunStatus::AwaitingApproval,
            Self::Executing | Self::CheckNext | Self::StepFailed => RunStatus::Executing,
            Self::Completed => RunStatus::Completed,
            Self::Failed => RunStatus::Failed,
            Self::Cancelled => RunStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunEvent {
    Start,
    Cancel,
    PolicyPass,
    PolicyFail,
    ApprovalRequired,
    NoApproval,
    Approved,
    Rejected,
    Timeout,
    StepComplete,
    StepFailed,
    HasNext,
    AllDone,
    Retry,
    Abort,
}

/// The run state machine (§4.7). Unexpected events in a state are silently
/// rejected — `apply` returns `false` and the state is left unchanged, per
/// spec: "callers must not rely on them to drive logic".
#[derive(Debug, Clone, Copy)]
pub struct RunStateMachine {
    state: RunState,
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self { state: RunState::Pending }
    }

    #[must_use]
    pub fn from_state(state: RunState) -> Self {
        Self { state }
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    #[must_use]
    pub fn run_status(&self) -> RunStatus {
        self.state.to_run_status()
    }

    /// Apply `event`. Returns whether the transition table defined a
    /// successor for `(state, event)`.
    pub fn apply(&mut self, event: RunEvent) -> bool {
        use RunEvent::*;
        use RunState::*;

        let next = match (self.state, event) {
            (Pending, Start) => Some(PolicyCheck),
            (Pending, Cancel) => Some(Cancelled),
            (PolicyCheck, PolicyPass) => Some(CheckApproval),
            (PolicyCheck, PolicyFail) => Some(Failed),
            (CheckApproval, ApprovalRequired) => Some(AwaitingApproval),
            (CheckApproval, NoApproval) => Some(Executing),
            (AwaitingApproval, Approved) => Some(Executing),
            (AwaitingApproval, Rejected) => Some(Cancelled),
            (AwaitingApproval, Cancel) => Some(Cancelled),
            (AwaitingApproval, Timeout) => Some(Failed),
            (Executing, StepComplete) => Some(CheckNext),
            (Executing, StepFailed) => Some(RunState::StepFailed),
            (Executing, Cancel) => Some(Cancelled),
            (CheckNext, HasNext) => Some(Executing),
            (CheckNext, AllDone) => Some(Completed),
            (RunState::StepFailed, Retry) => Some(Executing),
            (RunState::StepFailed, Abort) => Some(Failed),
            _ => None,
        };

        match next {
            Some(state) => {
                self.state = state;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_completed() {
        let mut sm = RunStateMachine::new();
        assert!(sm.apply(RunEvent::Start));
        assert!(sm.apply(RunEvent::PolicyPass));
        assert!(sm.apply(RunEvent::NoApproval));
        assert!(sm.apply(RunEvent::StepComplete));
        assert!(sm.apply(RunEvent::AllDone));
        assert_eq!(sm.state(), RunState::Completed);
        assert_eq!(sm.run_status(), RunStatus::Completed);
    }

    #[test]
    fn policy_failure_terminates_the_run() {
        let mut sm = RunStateMachine::new();
        sm.apply(RunEvent::Start);
        assert!(sm.apply(RunEvent::PolicyFail));
        assert_eq!(sm.state(), RunState::Failed);
        assert!(sm.state().is_terminal());
    }

    #[test]
    fn approval_gate_then_resume() {
        let mut sm = RunStateMachine::new();
        sm.apply(RunEvent::Start);
        sm.apply(RunEvent::PolicyPass);
        assert!(sm.apply(RunEvent::ApprovalRequired));
        assert_eq!(sm.run_status(), RunStatus::AwaitingApproval);
        assert!(sm.apply(RunEvent::Approved));
        assert_eq!(sm.state(), RunState::Executing);
    }

    #[test]
    fn retry_loops_back_to_executing_without_advancing() {
        let mut sm = RunStateMachine::new();
        sm.apply(RunEvent::Start);
        sm.apply(RunEvent::PolicyPass);
        sm.apply(RunEvent::NoApproval);
        assert!(sm.apply(RunEvent::StepFailed));
        assert_eq!(sm.state(), RunState::StepFailed);
        assert!(sm.apply(RunEvent::Retry));
        assert_eq!(sm.state(), RunState::Executing);
    }

    #[test]
    fn unexpected_event_is_silently_rejected() {
        let mut sm = RunStateMachine::new();
        assert!(!sm.apply(RunEvent::StepComplete));
        assert_eq!(sm.state(), RunState::Pending);
    }

    #[test]
    fn terminal_states_accept_nothing_further() {
        let mut sm = RunStateMachine::new();
        sm.apply(RunEvent::Start);
        sm.apply(RunEvent::PolicyFail);
        assert!(!sm.apply(RunEvent::Start));
        assert_eq!(sm.state(), RunState::Failed);
    }
}
