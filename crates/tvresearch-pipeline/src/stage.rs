//! The four pipeline stages.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::status::WorkflowStatus;

/// A pipeline stage. Each stage owns one queue lane of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    TrendResearch,
    NewsAggregation,
    ContentStrategy,
    FinalReporting,
}

impl StageKind {
    /// All stages in execution order.
    pub const ALL: [StageKind; 4] = [
        StageKind::TrendResearch,
        StageKind::NewsAggregation,
        StageKind::ContentStrategy,
        StageKind::FinalReporting,
    ];

    /// The stage every workflow starts with.
    pub fn first() -> Self {
        StageKind::TrendResearch
    }

    /// Queue lane serving this stage.
    pub fn lane(&self) -> &'static str {
        match self {
            StageKind::TrendResearch => "trend_research",
            StageKind::NewsAggregation => "news_aggregation",
            StageKind::ContentStrategy => "content_strategy",
            StageKind::FinalReporting => "final_reporting",
        }
    }

    /// Look up a stage by its lane name.
    pub fn from_lane(lane: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.lane() == lane)
    }

    /// Human readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            StageKind::TrendResearch => "Trend Research",
            StageKind::NewsAggregation => "News Aggregation",
            StageKind::ContentStrategy => "Content Strategy",
            StageKind::FinalReporting => "Final Reporting",
        }
    }

    /// 1-based position in the pipeline.
    pub fn position(&self) -> usize {
        match self {
            StageKind::TrendResearch => 1,
            StageKind::NewsAggregation => 2,
            StageKind::ContentStrategy => 3,
            StageKind::FinalReporting => 4,
        }
    }

    /// The stage that follows this one, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            StageKind::TrendResearch => Some(StageKind::NewsAggregation),
            StageKind::NewsAggregation => Some(StageKind::ContentStrategy),
            StageKind::ContentStrategy => Some(StageKind::FinalReporting),
            StageKind::FinalReporting => None,
        }
    }

    /// Whether this is the last stage.
    pub fn is_final(&self) -> bool {
        self.next().is_none()
    }

    /// Status written when a worker picks up this stage.
    pub fn running_status(&self) -> WorkflowStatus {
        match self {
            StageKind::TrendResearch => WorkflowStatus::TrendResearchRunning,
            StageKind::NewsAggregation => WorkflowStatus::NewsAggregationRunning,
            StageKind::ContentStrategy => WorkflowStatus::ContentStrategyRunning,
            StageKind::FinalReporting => WorkflowStatus::FinalReportingRunning,
        }
    }

    /// Status written when this stage succeeds.
    ///
    /// The final stage has no sub-state of its own: success completes the
    /// whole workflow.
    pub fn success_status(&self) -> WorkflowStatus {
        match self {
            StageKind::TrendResearch => WorkflowStatus::TrendResearchCompleted,
            StageKind::NewsAggregation => WorkflowStatus::NewsAggregationCompleted,
            StageKind::ContentStrategy => WorkflowStatus::ContentStrategyCompleted,
            StageKind::FinalReporting => WorkflowStatus::Completed,
        }
    }

    /// Key under which this stage's output is handed to later stages.
    pub fn output_key(&self) -> Option<&'static str> {
        match self {
            StageKind::TrendResearch => Some("trend_analysis"),
            StageKind::NewsAggregation => Some("news_analysis"),
            StageKind::ContentStrategy => Some("content_strategy"),
            StageKind::FinalReporting => None,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.lane())
    }
}
