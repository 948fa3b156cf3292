//! The cancellation/deadline token threaded through suspension points
//! (§5): provider calls, repository writes, rate-limit waits, retry
//! back-off sleeps, and async event dispatch. Grounded on the
//! `tokio_util::sync::CancellationToken` usage in
//! `llmspell-agents::lifecycle::state_machine`.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Wraps a [`CancellationToken`] with an optional deadline. A per-step
/// timeout takes precedence over an ambient deadline when both are set —
/// callers derive a child token with the sooner of the two (§5).
#[derive(Clone, Debug)]
pub struct CancelContext {
    token: CancellationToken,
    deadline: Option<Duration>,
}

impl Default for CancelContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    #[must_use]
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// A child context that is cancelled whenever `self` is, and whose
    /// deadline is the sooner of `self`'s and `timeout` (§5, "sooner wins").
    #[must_use]
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let deadline = match self.deadline {
            Some(existing) => Some(existing.min(timeout)),
            None => Some(timeout),
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_timeout_takes_the_sooner_deadline() {
        let parent = CancelContext::with_deadline(Duration::from_secs(60));
        let child = parent.child_with_timeout(Duration::from_secs(5));
        assert_eq!(child.deadline(), Some(Duration::from_secs(5)));

        let parent = CancelContext::with_deadline(Duration::from_secs(2));
        let child = parent.child_with_timeout(Duration::from_secs(5));
        assert_eq!(child.deadline(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn cancelling_parent_cancels_child() {
        let parent = CancelContext::new();
        let child = parent.child_with_timeout(Duration::from_secs(5));
        assert!(!child.is_cancelled());
        parent.cancel();
        assert!(child.is_cancelled());
    }
}
