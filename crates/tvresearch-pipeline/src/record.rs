//! Workflow record and partial status updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::stage::StageKind;
use crate::status::WorkflowStatus;

/// Record identifier.
pub type RecordId = i64;

/// Durable state of one workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub id: RecordId,
    pub topic: Option<String>,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result_content: Option<String>,
    pub error_message: Option<String>,
    pub execution_time_seconds: Option<i64>,
    pub job_reference: Option<String>,
}

impl WorkflowRecord {
    /// A fresh record in `queued` status.
    pub fn new(id: RecordId, topic: Option<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            topic,
            status: WorkflowStatus::Queued,
            created_at,
            completed_at: None,
            result_content: None,
            error_message: None,
            execution_time_seconds: None,
            job_reference: None,
        }
    }

    /// Apply a status update in place.
    ///
    /// Only the fields present in the update are overwritten. Reaching a
    /// terminal status stamps `completed_at` and the execution time.
    pub fn apply(&mut self, update: StatusUpdate, now: DateTime<Utc>) -> Result<(), StoreError> {
        if !self.status.can_transition_to(update.status) {
            return Err(StoreError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: update.status,
            });
        }
        match (&update.error_message, update.status) {
            (None, WorkflowStatus::Failed) => {
                return Err(StoreError::InvalidUpdate(
                    "a failed status requires an error message".to_string(),
                ));
            }
            (Some(_), status) if status != WorkflowStatus::Failed => {
                return Err(StoreError::InvalidUpdate(format!(
                    "error message not allowed with status {}",
                    status
                )));
            }
            _ => {}
        }

        self.status = update.status;
        if let Some(result) = update.result_content {
            self.result_content = Some(result);
        }
        if let Some(error) = update.error_message {
            self.error_message = Some(error);
        }
        if update.status.is_terminal() {
            self.completed_at = Some(now);
            self.execution_time_seconds = Some(
                update
                    .execution_time_seconds
                    .unwrap_or_else(|| elapsed_seconds(self.created_at, now)),
            );
        }
        Ok(())
    }

    /// Attach the handle of the job that started this run.
    pub fn set_job_reference(&mut self, reference: String) -> Result<(), StoreError> {
        if self.is_terminal() {
            return Err(StoreError::InvalidUpdate(format!(
                "record {} is already {}",
                self.id, self.status
            )));
        }
        self.job_reference = Some(reference);
        Ok(())
    }

    /// Whether the run is finished.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Whole seconds between two instants, rounded up.
pub fn elapsed_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let elapsed = end - start;
    let micros = elapsed
        .num_microseconds()
        .unwrap_or_else(|| elapsed.num_milliseconds().saturating_mul(1000))
        .max(0);
    (micros + 999_999) / 1_000_000
}

/// Partial update applied atomically by a record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: WorkflowStatus,
    pub result_content: Option<String>,
    pub error_message: Option<String>,
    pub execution_time_seconds: Option<i64>,
}

impl StatusUpdate {
    pub fn new(status: WorkflowStatus) -> Self {
        Self {
            status,
            result_content: None,
            error_message: None,
            execution_time_seconds: None,
        }
    }

    /// A stage was picked up by a worker.
    pub fn running(stage: StageKind) -> Self {
        Self::new(stage.running_status())
    }

    /// A stage produced its output.
    pub fn stage_completed(stage: StageKind, result: impl Into<String>) -> Self {
        Self::new(stage.success_status()).with_result(result)
    }

    /// The run failed.
    pub fn failed(error: impl Into<String>) -> Self {
        Self::new(WorkflowStatus::Failed).with_error(error)
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result_content = Some(result.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error_message = Some(error.into());
        self
    }

    pub fn with_execution_time(mut self, seconds: i64) -> Self {
        self.execution_time_seconds = Some(seconds.max(0));
        self
    }
}
