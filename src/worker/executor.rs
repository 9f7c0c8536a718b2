//! The execution step: what a worker does with a claimed payload.
//!
//! The queue never looks inside payloads. Whatever implements [`Executor`]
//! owns their meaning, and any timeout policy.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// Failure reported by an execution step. The message ends up in the job's
/// `last_error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExecutionError {
    message: String,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ExecutionError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ExecutionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, payload: &serde_json::Value) -> Result<(), ExecutionError>;
}

/// Placeholder step used by `jobq serve`: waits, logs the payload, succeeds.
#[derive(Debug, Clone)]
pub struct DelayExecutor {
    delay: Duration,
}

impl DelayExecutor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Executor for DelayExecutor {
    async fn execute(&self, payload: &serde_json::Value) -> Result<(), ExecutionError> {
        tokio::time::sleep(self.delay).await;
        info!(%payload, "processed job");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn delay_executor_succeeds_after_delay() {
        let executor = DelayExecutor::new(Duration::from_secs(2));
        let start = tokio::time::Instant::now();
        executor
            .execute(&serde_json::json!({"task": "x"}))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[test]
    fn execution_error_displays_its_message() {
        let err = ExecutionError::from("boom");
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.message(), "boom");
    }
}
