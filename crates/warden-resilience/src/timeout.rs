//! Bounds a synchronous call; on expiry raises a non-retryable timeout
//! error (§4.5).

use std::future::Future;
use std::time::Duration;
use warden_core::{Result, WardenError};

#[derive(Debug, Clone, Copy)]
pub struct Timeout {
    pub duration: Duration,
}

impl Timeout {
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub async fn call<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.duration, fut).await {
            Ok(result) => result,
            Err(_) => Err(WardenError::StepTimeout(format!(
                "call exceeded timeout of {:?}",
                self.duration
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn call_within_budget_succeeds() {
        let t = Timeout::new(Duration::from_millis(50));
        let result = t.call(async { Ok::<_, WardenError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn call_exceeding_budget_times_out() {
        let t = Timeout::new(Duration::from_millis(10));
        let result = t
            .call(async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<_, WardenError>(42)
            })
            .await;
        assert!(matches!(result, Err(WardenError::StepTimeout(_))));
    }
}
