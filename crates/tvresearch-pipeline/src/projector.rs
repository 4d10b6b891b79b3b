//! Client-facing view of workflow status.

use serde::Serialize;

use crate::record::WorkflowRecord;
use crate::stage::StageKind;
use crate::status::WorkflowStatus;

/// Coarse state reported to polling clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalState {
    Queued,
    Running,
    Completed,
    Failed,
}

/// What a polling client sees for a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusProjection {
    pub state: ExternalState,
    /// Stage currently running or last finished, while the run is active.
    pub stage: Option<StageKind>,
    pub label: &'static str,
    /// Rough progress. `None` once the run has failed.
    pub progress_percent: Option<u8>,
}

/// Project a persisted status onto the client view.
pub fn project(status: WorkflowStatus) -> StatusProjection {
    let (state, label, progress) = match status {
        WorkflowStatus::Queued => (ExternalState::Queued, "Queued", Some(0)),
        WorkflowStatus::TrendResearchRunning => {
            (ExternalState::Running, "Researching trends", Some(10))
        }
        WorkflowStatus::TrendResearchCompleted => {
            (ExternalState::Running, "Trend research complete", Some(25))
        }
        WorkflowStatus::NewsAggregationRunning => {
            (ExternalState::Running, "Aggregating news", Some(35))
        }
        WorkflowStatus::NewsAggregationCompleted => {
            (ExternalState::Running, "News aggregation complete", Some(50))
        }
        WorkflowStatus::ContentStrategyRunning => {
            (ExternalState::Running, "Developing content strategy", Some(60))
        }
        WorkflowStatus::ContentStrategyCompleted => {
            (ExternalState::Running, "Content strategy complete", Some(75))
        }
        WorkflowStatus::FinalReportingRunning => {
            (ExternalState::Running, "Compiling final report", Some(85))
        }
        WorkflowStatus::Completed => (ExternalState::Completed, "Completed", Some(100)),
        WorkflowStatus::Failed => (ExternalState::Failed, "Failed", None),
    };

    StatusProjection {
        state,
        stage: status.stage(),
        label,
        progress_percent: progress,
    }
}

/// A record together with its projected status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordView {
    #[serde(flatten)]
    pub record: WorkflowRecord,
    pub progress: StatusProjection,
}

impl From<WorkflowRecord> for RecordView {
    fn from(record: WorkflowRecord) -> Self {
        let progress = project(record.status);
        Self { record, progress }
    }
}
