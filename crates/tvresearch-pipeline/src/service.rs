//! Intake and query operations for clients.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use tvresearch_workqueue::JobQueue;

use crate::coordinator::PipelineCoordinator;
use crate::error::PipelineError;
use crate::projector::RecordView;
use crate::record::{RecordId, WorkflowRecord};
use crate::stage::StageKind;
use crate::status::WorkflowStatus;
use crate::store::RecordStore;

/// Default page size for listings.
pub const DEFAULT_LIST_LIMIT: usize = 50;

const RECENT_ACTIVITY: usize = 10;
const FAST_SECS: i64 = 30;
const SLOW_SECS: i64 = 120;

/// Waiting jobs per lane.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    /// Jobs eligible to run, per lane.
    pub queues: BTreeMap<String, usize>,
    /// Jobs waiting on their predecessor, per lane.
    pub deferred: BTreeMap<String, usize>,
    pub running: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub active: usize,
    /// Completed share of all records, in percent.
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionTimeDistribution {
    pub fast: usize,
    pub medium: usize,
    pub slow: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceStats {
    /// Mean execution time of completed runs, in seconds.
    pub avg_execution_time: f64,
    pub execution_time_distribution: ExecutionTimeDistribution,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentActivity {
    pub id: RecordId,
    pub topic: Option<String>,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
    pub execution_time_seconds: Option<i64>,
}

/// Aggregate statistics over all records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineMetrics {
    pub research_stats: ResearchStats,
    pub performance: PerformanceStats,
    pub recent_activity: Vec<RecentActivity>,
    pub timestamp: DateTime<Utc>,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl PipelineMetrics {
    /// Compute metrics from records ordered newest first.
    pub fn from_records(records: &[WorkflowRecord]) -> Self {
        let total = records.len();
        let completed: Vec<&WorkflowRecord> = records
            .iter()
            .filter(|r| r.status == WorkflowStatus::Completed)
            .collect();
        let failed = records
            .iter()
            .filter(|r| r.status == WorkflowStatus::Failed)
            .count();
        let active = records.iter().filter(|r| !r.is_terminal()).count();

        let success_rate = if total == 0 {
            0.0
        } else {
            round1(completed.len() as f64 / total as f64 * 100.0)
        };

        let times: Vec<i64> = completed
            .iter()
            .filter_map(|r| r.execution_time_seconds)
            .collect();
        let avg_execution_time = if times.is_empty() {
            0.0
        } else {
            round1(times.iter().sum::<i64>() as f64 / times.len() as f64)
        };
        let distribution = ExecutionTimeDistribution {
            fast: times.iter().filter(|t| **t < FAST_SECS).count(),
            medium: times
                .iter()
                .filter(|t| (FAST_SECS..SLOW_SECS).contains(*t))
                .count(),
            slow: times.iter().filter(|t| **t >= SLOW_SECS).count(),
        };

        let recent_activity = records
            .iter()
            .take(RECENT_ACTIVITY)
            .map(|r| RecentActivity {
                id: r.id,
                topic: r.topic.clone(),
                status: r.status,
                created_at: r.created_at,
                execution_time_seconds: r.execution_time_seconds,
            })
            .collect();

        Self {
            research_stats: ResearchStats {
                total,
                completed: completed.len(),
                failed,
                active,
                success_rate,
            },
            performance: PerformanceStats {
                avg_execution_time,
                execution_time_distribution: distribution,
            },
            recent_activity,
            timestamp: Utc::now(),
        }
    }
}

/// Client operations over the pipeline.
#[derive(Clone)]
pub struct ResearchService {
    store: Arc<dyn RecordStore>,
    queue: Arc<JobQueue>,
    coordinator: Arc<PipelineCoordinator>,
}

impl ResearchService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        queue: Arc<JobQueue>,
        coordinator: Arc<PipelineCoordinator>,
    ) -> Self {
        Self {
            store,
            queue,
            coordinator,
        }
    }

    /// Create a record and start its workflow.
    ///
    /// A blank topic means trending topics. When the first job cannot be
    /// enqueued the record is returned in `failed` status.
    pub async fn submit(&self, topic: Option<String>) -> Result<RecordView, PipelineError> {
        let topic = topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let id = self.store.create(topic.clone()).await?;
        info!(record_id = id, topic = topic.as_deref().unwrap_or("trending"), "Research requested");

        match self.coordinator.start(id, topic.as_deref()).await {
            Ok(_) => {}
            Err(e @ PipelineError::Enqueue { .. }) => {
                warn!(record_id = id, "Research could not be started: {}", e);
            }
            Err(e) => return Err(e),
        }

        self.get(id).await
    }

    pub async fn get(&self, id: RecordId) -> Result<RecordView, PipelineError> {
        Ok(self.store.get(id).await?.into())
    }

    pub async fn list(&self, limit: usize, offset: usize) -> Result<Vec<RecordView>, PipelineError> {
        let records = self.store.list(limit, offset).await?;
        Ok(records.into_iter().map(RecordView::from).collect())
    }

    /// Delete a record. Jobs still queued for it become no-ops.
    pub async fn delete(&self, id: RecordId) -> Result<(), PipelineError> {
        self.store.delete(id).await?;
        info!(record_id = id, "Research record deleted");
        Ok(())
    }

    pub async fn queue_status(&self) -> Result<QueueStatus, PipelineError> {
        let mut queues = BTreeMap::new();
        let mut deferred = BTreeMap::new();
        for stage in StageKind::ALL {
            let lane = stage.lane();
            queues.insert(lane.to_string(), self.queue.count(lane).await?);
            deferred.insert(lane.to_string(), self.queue.deferred_count(lane).await?);
        }

        Ok(QueueStatus {
            queues,
            deferred,
            running: self.queue.running_count().await,
            timestamp: Utc::now(),
        })
    }

    pub async fn metrics(&self) -> Result<PipelineMetrics, PipelineError> {
        let records = self.store.list(usize::MAX, 0).await?;
        Ok(PipelineMetrics::from_records(&records))
    }
}
