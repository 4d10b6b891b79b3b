//! Queue errors.

use thiserror::Error;

/// Queue error types.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Lane was not registered with the queue.
    #[error("Unknown lane: {0}")]
    UnknownLane(String),

    /// Lane is full.
    #[error("Queue '{0}' is full")]
    QueueFull(String),

    /// Worker error.
    #[error("Worker error: {0}")]
    WorkerError(String),

    /// Persistence error raised by a job handler.
    #[error("Database error: {0}")]
    Database(String),

    /// Job execution failed.
    #[error("Job execution failed: {0}")]
    ExecutionFailed(String),

    /// Job payload could not be decoded.
    #[error("Invalid job payload: {0}")]
    InvalidPayload(String),
}

impl QueueError {
    /// Whether a worker should put the job back for another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueueError::Database(_) | QueueError::WorkerError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(QueueError::Database("locked".to_string()).is_retryable());
        assert!(QueueError::WorkerError("closed".to_string()).is_retryable());
    }

    #[test]
    fn test_terminal_errors() {
        assert!(!QueueError::ExecutionFailed("boom".to_string()).is_retryable());
        assert!(!QueueError::InvalidPayload("bad".to_string()).is_retryable());
        assert!(!QueueError::QueueFull("trend_research".to_string()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = QueueError::QueueFull("news_aggregation".to_string());
        assert_eq!(err.to_string(), "Queue 'news_aggregation' is full");
    }
}
