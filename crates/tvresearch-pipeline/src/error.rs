//! Pipeline error types.

use thiserror::Error;
use tvresearch_workqueue::QueueError;

use crate::stage::StageKind;
use crate::status::WorkflowStatus;

/// Errors from a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(i64),

    #[error("Invalid status transition for record {id}: {from} -> {to}")]
    InvalidTransition {
        id: i64,
        from: WorkflowStatus,
        to: WorkflowStatus,
    },

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt record {id}: {message}")]
    Corrupt { id: i64, message: String },
}

impl StoreError {
    /// Whether a later attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Database(_))
    }
}

impl From<tokio_rusqlite::Error> for StoreError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Errors raised by a stage capability.
///
/// The display text of a capability error becomes the record's
/// `error_message`, so `Failed` carries the capability's own words unchanged.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("{0}")]
    Failed(String),

    #[error("No capability registered for stage {0}")]
    Missing(StageKind),

    #[error("Stage {stage} timed out after {millis}ms")]
    Timeout { stage: StageKind, millis: u64 },

    #[error("Stage {0} returned no output")]
    EmptyOutput(StageKind),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors from pipeline coordination.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Stage {stage} failed: {source}")]
    Capability {
        stage: StageKind,
        #[source]
        source: CapabilityError,
    },

    #[error("Failed to enqueue {stage} job: {source}")]
    Enqueue {
        stage: StageKind,
        #[source]
        source: QueueError,
    },

    #[error("Invalid job payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl PipelineError {
    /// Whether the error means the requested record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PipelineError::Store(StoreError::NotFound(_)))
    }
}

impl From<PipelineError> for QueueError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Store(e) if e.is_transient() => QueueError::Database(e.to_string()),
            PipelineError::InvalidPayload(message) => QueueError::InvalidPayload(message),
            PipelineError::Queue(e) => e,
            other => QueueError::ExecutionFailed(other.to_string()),
        }
    }
}
