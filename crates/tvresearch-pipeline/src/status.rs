//! Workflow status lifecycle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stage::StageKind;

/// Status of a workflow record.
///
/// Successful workflows walk [`WorkflowStatus::SEQUENCE`] one step at a
/// time. Any non-terminal status may move to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Queued,
    TrendResearchRunning,
    TrendResearchCompleted,
    NewsAggregationRunning,
    NewsAggregationCompleted,
    ContentStrategyRunning,
    ContentStrategyCompleted,
    FinalReportingRunning,
    Completed,
    Failed,
}

/// Unrecognized status text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown workflow status: {0}")]
pub struct StatusParseError(pub String);

impl WorkflowStatus {
    /// Successful lifecycle in order.
    pub const SEQUENCE: [WorkflowStatus; 9] = [
        WorkflowStatus::Queued,
        WorkflowStatus::TrendResearchRunning,
        WorkflowStatus::TrendResearchCompleted,
        WorkflowStatus::NewsAggregationRunning,
        WorkflowStatus::NewsAggregationCompleted,
        WorkflowStatus::ContentStrategyRunning,
        WorkflowStatus::ContentStrategyCompleted,
        WorkflowStatus::FinalReportingRunning,
        WorkflowStatus::Completed,
    ];

    /// Persisted text form.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Queued => "queued",
            WorkflowStatus::TrendResearchRunning => "trend_research_running",
            WorkflowStatus::TrendResearchCompleted => "trend_research_completed",
            WorkflowStatus::NewsAggregationRunning => "news_aggregation_running",
            WorkflowStatus::NewsAggregationCompleted => "news_aggregation_completed",
            WorkflowStatus::ContentStrategyRunning => "content_strategy_running",
            WorkflowStatus::ContentStrategyCompleted => "content_strategy_completed",
            WorkflowStatus::FinalReportingRunning => "final_reporting_running",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Failed => "failed",
        }
    }

    /// Whether the record is finished for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Failed)
    }

    /// Whether a stage is executing.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::TrendResearchRunning
                | WorkflowStatus::NewsAggregationRunning
                | WorkflowStatus::ContentStrategyRunning
                | WorkflowStatus::FinalReportingRunning
        )
    }

    /// Position in [`Self::SEQUENCE`]. `Failed` has none.
    pub fn position(&self) -> Option<usize> {
        Self::SEQUENCE.iter().position(|status| status == self)
    }

    /// The stage this status belongs to, if any.
    pub fn stage(&self) -> Option<StageKind> {
        match self {
            WorkflowStatus::TrendResearchRunning | WorkflowStatus::TrendResearchCompleted => {
                Some(StageKind::TrendResearch)
            }
            WorkflowStatus::NewsAggregationRunning | WorkflowStatus::NewsAggregationCompleted => {
                Some(StageKind::NewsAggregation)
            }
            WorkflowStatus::ContentStrategyRunning | WorkflowStatus::ContentStrategyCompleted => {
                Some(StageKind::ContentStrategy)
            }
            WorkflowStatus::FinalReportingRunning => Some(StageKind::FinalReporting),
            WorkflowStatus::Queued | WorkflowStatus::Completed | WorkflowStatus::Failed => None,
        }
    }

    /// Whether a record in this status may move to `next`.
    ///
    /// Allowed: the next step of the sequence, re-entering a running status
    /// (a retried stage), or failing from any non-terminal status.
    pub fn can_transition_to(&self, next: WorkflowStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == WorkflowStatus::Failed {
            return true;
        }
        if next == *self {
            return self.is_running();
        }
        match (self.position(), next.position()) {
            (Some(from), Some(to)) => to == from + 1,
            _ => false,
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::SEQUENCE
            .into_iter()
            .chain([WorkflowStatus::Failed])
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StatusParseError(s.to_string()))
    }
}

impl Default for WorkflowStatus {
    fn default() -> Self {
        WorkflowStatus::Queued
    }
}
