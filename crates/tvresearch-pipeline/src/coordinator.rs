//! Drives a workflow record through the four stages.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};
use tvresearch_workqueue::{Job, JobHandler, JobId, JobQueue, QueueError};

use crate::error::{PipelineError, StoreError};
use crate::executor::{CapabilitySet, StageExecutor};
use crate::inputs::{AccumulatedInputs, RequestParameters};
use crate::job::StageJob;
use crate::record::{RecordId, StatusUpdate, WorkflowRecord};
use crate::stage::StageKind;
use crate::status::WorkflowStatus;
use crate::store::RecordStore;

/// Result of running one stage job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage succeeded and the next stage was enqueued.
    Advanced { next: StageKind, job_id: JobId },
    /// The final stage succeeded.
    Completed,
    /// The job had nothing to do.
    Skipped(SkipReason),
}

/// Why a stage job was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The record was deleted.
    RecordDeleted,
    /// The record already reached a terminal status.
    AlreadyTerminal(WorkflowStatus),
    /// The record is not in a status this stage can start from.
    OutOfOrder(WorkflowStatus),
}

/// Pipeline coordinator.
///
/// Runs one stage per job: marks the stage running, invokes its capability,
/// records the output and enqueues the next stage behind the current job.
/// A failing stage marks the record failed and ends the chain.
pub struct PipelineCoordinator {
    store: Arc<dyn RecordStore>,
    queue: Arc<JobQueue>,
    capabilities: CapabilitySet,
    executor: StageExecutor,
}

enum Write {
    Applied(WorkflowRecord),
    Gone,
    Rejected(WorkflowStatus),
}

impl PipelineCoordinator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        queue: Arc<JobQueue>,
        capabilities: CapabilitySet,
        executor: StageExecutor,
    ) -> Self {
        Self {
            store,
            queue,
            capabilities,
            executor,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }

    fn stage_job(
        &self,
        stage: StageKind,
        record_id: RecordId,
        inputs: AccumulatedInputs,
    ) -> Result<Job, PipelineError> {
        StageJob::new(stage, record_id, inputs).into_job(self.queue.config().max_retries)
    }

    /// Enqueue the first stage for a freshly created record.
    ///
    /// If the job cannot be enqueued the record is marked failed and the
    /// enqueue error is returned.
    pub async fn start(
        &self,
        record_id: RecordId,
        topic: Option<&str>,
    ) -> Result<JobId, PipelineError> {
        let stage = StageKind::first();
        let inputs = AccumulatedInputs::new(RequestParameters::for_topic(topic));
        let job = self.stage_job(stage, record_id, inputs)?;

        // The reference is written while the record is still queued.
        self.store
            .set_job_reference(record_id, job.id.to_string())
            .await?;

        match self.queue.enqueue(stage.lane(), job).await {
            Ok(job_id) => {
                info!(record_id, %job_id, "Research workflow started");
                Ok(job_id)
            }
            Err(source) => {
                let message = format!("Failed to enqueue job: {}", source);
                error!(record_id, "{}", message);
                self.mark_failed(record_id, &message).await?;
                Err(PipelineError::Enqueue { stage, source })
            }
        }
    }

    /// Run the stage carried by a job.
    pub async fn run_stage(
        &self,
        job_id: JobId,
        job: StageJob,
    ) -> Result<StageOutcome, PipelineError> {
        let StageJob {
            stage,
            record_id,
            inputs,
        } = job;

        let record = match self.store.get(record_id).await {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => {
                info!(record_id, %stage, "Record was deleted, skipping stage");
                return Ok(StageOutcome::Skipped(SkipReason::RecordDeleted));
            }
            Err(e) => return Err(e.into()),
        };

        if record.is_terminal() {
            warn!(record_id, %stage, status = %record.status, "Stale job for finished record, skipping");
            return Ok(StageOutcome::Skipped(SkipReason::AlreadyTerminal(record.status)));
        }

        // A previous attempt recorded this stage but did not hand off.
        if !stage.is_final() && record.status == stage.success_status() {
            info!(record_id, %stage, "Stage already recorded, resuming hand-off");
            let output = record.result_content.unwrap_or_default();
            return self.hand_off(job_id, stage, record_id, inputs, output).await;
        }

        match self.write(record_id, StatusUpdate::running(stage)).await? {
            Write::Applied(_) => {}
            Write::Gone => return Ok(StageOutcome::Skipped(SkipReason::RecordDeleted)),
            Write::Rejected(status) => {
                warn!(record_id, %stage, %status, "Record not ready for stage, skipping");
                return Ok(StageOutcome::Skipped(SkipReason::OutOfOrder(status)));
            }
        }
        info!(record_id, %stage, %job_id, "Stage started");

        let output = match self.invoke(stage, &inputs).await {
            Ok(output) => output,
            Err(err) => {
                let message = match &err {
                    PipelineError::Capability { source, .. } => source.to_string(),
                    other => other.to_string(),
                };
                error!(record_id, %stage, "Stage failed: {}", message);
                self.mark_failed(record_id, &message).await?;
                return Err(err);
            }
        };

        if stage.is_final() {
            return match self
                .write(record_id, StatusUpdate::stage_completed(stage, output))
                .await?
            {
                Write::Applied(record) => {
                    info!(
                        record_id,
                        execution_time = record.execution_time_seconds,
                        "Research workflow completed"
                    );
                    Ok(StageOutcome::Completed)
                }
                Write::Gone => Ok(StageOutcome::Skipped(SkipReason::RecordDeleted)),
                Write::Rejected(status) => {
                    Ok(StageOutcome::Skipped(SkipReason::AlreadyTerminal(status)))
                }
            };
        }

        match self
            .write(record_id, StatusUpdate::stage_completed(stage, output.clone()))
            .await?
        {
            Write::Applied(_) => info!(record_id, %stage, "Stage completed"),
            Write::Gone => return Ok(StageOutcome::Skipped(SkipReason::RecordDeleted)),
            Write::Rejected(status) => {
                warn!(record_id, %stage, %status, "Stage result rejected, skipping hand-off");
                return Ok(StageOutcome::Skipped(SkipReason::OutOfOrder(status)));
            }
        }

        self.hand_off(job_id, stage, record_id, inputs, output).await
    }

    async fn invoke(
        &self,
        stage: StageKind,
        inputs: &AccumulatedInputs,
    ) -> Result<String, PipelineError> {
        let capability = self
            .capabilities
            .get(stage)
            .map_err(|source| PipelineError::Capability { stage, source })?;
        self.executor.execute(capability.as_ref(), stage, inputs).await
    }

    /// Enqueue the stage after `stage`, deferred behind the job that ran it.
    async fn hand_off(
        &self,
        job_id: JobId,
        stage: StageKind,
        record_id: RecordId,
        inputs: AccumulatedInputs,
        output: String,
    ) -> Result<StageOutcome, PipelineError> {
        let Some(next) = stage.next() else {
            return Ok(StageOutcome::Completed);
        };

        let inputs = inputs.with_stage_output(stage, output);
        let job = self.stage_job(next, record_id, inputs)?;
        match self.queue.enqueue_after(next.lane(), job, job_id).await {
            Ok(next_job) => {
                info!(record_id, stage = %next, job_id = %next_job, "Next stage enqueued");
                Ok(StageOutcome::Advanced {
                    next,
                    job_id: next_job,
                })
            }
            Err(source) => {
                let message = format!("Failed to enqueue {} job: {}", next, source);
                error!(record_id, "{}", message);
                self.mark_failed(record_id, &message).await?;
                Err(PipelineError::Enqueue {
                    stage: next,
                    source,
                })
            }
        }
    }

    async fn write(&self, record_id: RecordId, update: StatusUpdate) -> Result<Write, PipelineError> {
        match self.store.update_status(record_id, update).await {
            Ok(record) => Ok(Write::Applied(record)),
            Err(StoreError::NotFound(_)) => {
                info!(record_id, "Record was deleted during stage");
                Ok(Write::Gone)
            }
            Err(StoreError::InvalidTransition { from, .. }) => Ok(Write::Rejected(from)),
            Err(e) => Err(e.into()),
        }
    }

    /// Mark a record failed. Deleted or already finished records are left alone.
    async fn mark_failed(&self, record_id: RecordId, message: &str) -> Result<(), PipelineError> {
        match self.write(record_id, StatusUpdate::failed(message)).await? {
            Write::Applied(_) | Write::Gone => Ok(()),
            Write::Rejected(status) => {
                warn!(record_id, %status, "Record already finished, failure not recorded");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl JobHandler for PipelineCoordinator {
    async fn handle(&self, job: &Job) -> Result<(), QueueError> {
        let stage_job = StageJob::from_job(job)?;
        self.run_stage(job.id, stage_job).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
