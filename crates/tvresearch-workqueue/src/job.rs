//! Job definition and status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job identifier handed out by the queue.
pub type JobId = Uuid;

/// Job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for its predecessor job to finish.
    Deferred,
    /// Waiting in its lane.
    Queued,
    /// Currently being processed.
    Running,
    /// Completed successfully.
    Completed,
    /// Failed without retry.
    Failed,
    /// Retries exhausted.
    DeadLetter,
    /// Never run because its predecessor did not succeed.
    Cancelled,
}

impl JobStatus {
    /// Whether the job will never run again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::DeadLetter | JobStatus::Cancelled
        )
    }

    /// Whether dependents of a job in this status may be released.
    pub fn releases_dependents(&self) -> bool {
        matches!(self, JobStatus::Completed)
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Queued
    }
}

/// A job in a lane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID.
    pub id: JobId,
    /// Lane the job was submitted to.
    pub lane: String,
    /// Job name for logs.
    pub name: String,
    /// Handler-specific payload.
    pub payload: serde_json::Value,
    /// Current status.
    pub status: JobStatus,
    /// Predecessor that must complete first.
    pub depends_on: Option<JobId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Earliest execution time (None = immediate).
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Number of retry attempts.
    pub retry_count: u32,
    /// Maximum retries allowed.
    pub max_retries: u32,
    /// Last error message.
    pub last_error: Option<String>,
}

impl Job {
    /// Create a new job.
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            lane: String::new(),
            name: name.into(),
            payload,
            status: JobStatus::Queued,
            depends_on: None,
            created_at: now,
            updated_at: now,
            scheduled_at: None,
            retry_count: 0,
            max_retries: 3,
            last_error: None,
        }
    }

    /// Set scheduled execution time.
    pub fn with_scheduled_at(mut self, time: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(time);
        self
    }

    /// Set maximum retries.
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Check if job can be retried.
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Check if job is ready to run.
    pub fn is_ready(&self) -> bool {
        if self.status != JobStatus::Queued {
            return false;
        }

        match self.scheduled_at {
            Some(scheduled) => scheduled <= Utc::now(),
            None => true,
        }
    }

    pub(crate) fn set_status(&mut self, status: JobStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
