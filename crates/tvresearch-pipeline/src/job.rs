//! Stage jobs carried through the queue.

use serde::{Deserialize, Serialize};
use tvresearch_workqueue::Job;

use crate::error::PipelineError;
use crate::inputs::AccumulatedInputs;
use crate::record::RecordId;
use crate::stage::StageKind;

/// Payload of a stage job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageJob {
    pub stage: StageKind,
    pub record_id: RecordId,
    pub inputs: AccumulatedInputs,
}

impl StageJob {
    pub fn new(stage: StageKind, record_id: RecordId, inputs: AccumulatedInputs) -> Self {
        Self {
            stage,
            record_id,
            inputs,
        }
    }

    /// Wrap into a queue job.
    pub fn into_job(self, max_retries: u32) -> Result<Job, PipelineError> {
        let name = format!("{}:{}", self.stage.lane(), self.record_id);
        let payload =
            serde_json::to_value(&self).map_err(|e| PipelineError::InvalidPayload(e.to_string()))?;
        Ok(Job::new(name, payload).with_max_retries(max_retries))
    }

    /// Read the payload of a queue job.
    pub fn from_job(job: &Job) -> Result<Self, PipelineError> {
        let stage_job: StageJob = serde_json::from_value(job.payload.clone())
            .map_err(|e| PipelineError::InvalidPayload(e.to_string()))?;

        if !job.lane.is_empty() && job.lane != stage_job.stage.lane() {
            return Err(PipelineError::InvalidPayload(format!(
                "{} job delivered on lane {}",
                stage_job.stage, job.lane
            )));
        }
        Ok(stage_job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::RequestParameters;

    fn stage_job() -> StageJob {
        StageJob::new(
            StageKind::NewsAggregation,
            12,
            AccumulatedInputs::new(RequestParameters::for_topic(None))
                .with_stage_output(StageKind::TrendResearch, "trends".to_string()),
        )
    }

    #[test]
    fn test_into_job() {
        let job = stage_job().into_job(5).unwrap();
        assert_eq!(job.name, "news_aggregation:12");
        assert_eq!(job.max_retries, 5);
        assert_eq!(job.payload["stage"], "news_aggregation");
        assert_eq!(job.payload["record_id"], 12);
    }

    #[test]
    fn test_from_job() {
        let original = stage_job();
        let job = original.clone().into_job(3).unwrap();
        assert_eq!(StageJob::from_job(&job).unwrap(), original);
    }

    #[test]
    fn test_from_job_rejects_wrong_lane() {
        let mut job = stage_job().into_job(3).unwrap();
        job.lane = "final_reporting".to_string();
        assert!(matches!(
            StageJob::from_job(&job),
            Err(PipelineError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_from_job_rejects_garbage() {
        let job = Job::new("bad", serde_json::json!({"stage": "unknown"}));
        assert!(matches!(
            StageJob::from_job(&job),
            Err(PipelineError::InvalidPayload(_))
        ));
    }
}
