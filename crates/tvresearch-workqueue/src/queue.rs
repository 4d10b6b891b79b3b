//! Lane-based job queue with dependency deferral.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::job::{Job, JobId, JobStatus};

#[derive(Default)]
struct QueueState {
    /// Eligible jobs per lane, FIFO.
    lanes: HashMap<String, VecDeque<Job>>,
    /// Deferred jobs keyed by the predecessor they wait on.
    dependents: HashMap<JobId, Vec<Job>>,
    /// Status of every job that has not finished yet.
    active: HashMap<JobId, JobStatus>,
    /// Outcomes of finished jobs, oldest first.
    finished: HashMap<JobId, JobStatus>,
    finished_order: VecDeque<JobId>,
    /// Jobs whose retries ran out, oldest first.
    dead_letter: VecDeque<Job>,
}

impl QueueState {
    fn lane_mut(&mut self, lane: &str) -> Result<&mut VecDeque<Job>, QueueError> {
        self.lanes
            .get_mut(lane)
            .ok_or_else(|| QueueError::UnknownLane(lane.to_string()))
    }

    fn record_finished(&mut self, id: JobId, status: JobStatus, retention: usize) {
        self.active.remove(&id);
        if self.finished.insert(id, status).is_none() {
            self.finished_order.push_back(id);
        }
        while self.finished_order.len() > retention {
            if let Some(old) = self.finished_order.pop_front() {
                self.finished.remove(&old);
            }
        }
    }
}

/// FIFO job queue with one lane per stage.
pub struct JobQueue {
    config: QueueConfig,
    state: Mutex<QueueState>,
    notifiers: HashMap<String, Arc<Notify>>,
}

impl JobQueue {
    /// Create a queue with the given lanes.
    pub fn new<I, S>(config: QueueConfig, lanes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = QueueState::default();
        let mut notifiers = HashMap::new();
        for lane in lanes {
            let lane = lane.into();
            state.lanes.insert(lane.clone(), VecDeque::new());
            notifiers.insert(lane, Arc::new(Notify::new()));
        }

        Self {
            config,
            state: Mutex::new(state),
            notifiers,
        }
    }

    /// Queue configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Registered lane names.
    pub fn lanes(&self) -> Vec<String> {
        let mut lanes: Vec<String> = self.notifiers.keys().cloned().collect();
        lanes.sort();
        lanes
    }

    fn notify(&self, lane: &str) {
        if let Some(notify) = self.notifiers.get(lane) {
            notify.notify_one();
        }
    }

    fn check_capacity(&self, state: &QueueState, lane: &str) -> Result<(), QueueError> {
        if self.config.max_queue_size == 0 {
            return Ok(());
        }
        let waiting = state.lanes.get(lane).map_or(0, VecDeque::len)
            + Self::deferred_in(state, lane);
        if waiting as u64 >= self.config.max_queue_size {
            return Err(QueueError::QueueFull(lane.to_string()));
        }
        Ok(())
    }

    fn deferred_in(state: &QueueState, lane: &str) -> usize {
        state
            .dependents
            .values()
            .flatten()
            .filter(|job| job.lane == lane)
            .count()
    }

    /// Enqueue a job that is eligible immediately.
    pub async fn enqueue(&self, lane: &str, mut job: Job) -> Result<JobId, QueueError> {
        let mut state = self.state.lock().await;
        self.check_capacity(&state, lane)?;

        job.lane = lane.to_string();
        job.depends_on = None;
        job.set_status(JobStatus::Queued);
        let id = job.id;

        debug!(job_id = %id, lane, "Enqueueing job");
        state.lane_mut(lane)?.push_back(job);
        state.active.insert(id, JobStatus::Queued);
        drop(state);

        self.notify(lane);
        Ok(id)
    }

    /// Enqueue a job that becomes eligible only after `predecessor` completes.
    ///
    /// A predecessor that already completed, or whose outcome is no longer
    /// retained, releases the job at once. A predecessor that failed cancels it.
    pub async fn enqueue_after(
        &self,
        lane: &str,
        mut job: Job,
        predecessor: JobId,
    ) -> Result<JobId, QueueError> {
        let mut state = self.state.lock().await;
        if !state.lanes.contains_key(lane) {
            return Err(QueueError::UnknownLane(lane.to_string()));
        }
        self.check_capacity(&state, lane)?;

        job.lane = lane.to_string();
        job.depends_on = Some(predecessor);
        let id = job.id;

        if state.active.contains_key(&predecessor) {
            debug!(job_id = %id, lane, %predecessor, "Deferring job until predecessor finishes");
            job.set_status(JobStatus::Deferred);
            state.active.insert(id, JobStatus::Deferred);
            state.dependents.entry(predecessor).or_default().push(job);
            return Ok(id);
        }

        match state.finished.get(&predecessor).copied() {
            Some(status) if !status.releases_dependents() => {
                warn!(job_id = %id, lane, %predecessor, ?status, "Predecessor did not succeed, cancelling job");
                job.set_status(JobStatus::Cancelled);
                state.record_finished(id, JobStatus::Cancelled, self.config.finished_retention);
                Ok(id)
            }
            _ => {
                debug!(job_id = %id, lane, %predecessor, "Predecessor already finished, enqueueing job");
                job.set_status(JobStatus::Queued);
                state.lane_mut(lane)?.push_back(job);
                state.active.insert(id, JobStatus::Queued);
                drop(state);
                self.notify(lane);
                Ok(id)
            }
        }
    }

    /// Take the oldest ready job from a lane.
    pub async fn dequeue(&self, lane: &str) -> Result<Option<Job>, QueueError> {
        let mut state = self.state.lock().await;
        let queue = state.lane_mut(lane)?;

        let Some(position) = queue.iter().position(Job::is_ready) else {
            return Ok(None);
        };
        let mut job = match queue.remove(position) {
            Some(job) => job,
            None => return Ok(None),
        };

        job.set_status(JobStatus::Running);
        state.active.insert(job.id, JobStatus::Running);
        debug!(job_id = %job.id, lane, "Dequeued job");

        Ok(Some(job))
    }

    /// Take the oldest ready job, waiting up to `timeout` for one to arrive.
    pub async fn dequeue_wait(
        &self,
        lane: &str,
        timeout: Duration,
    ) -> Result<Option<Job>, QueueError> {
        let notify = self
            .notifiers
            .get(lane)
            .cloned()
            .ok_or_else(|| QueueError::UnknownLane(lane.to_string()))?;
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if let Some(job) = self.dequeue(lane).await? {
                return Ok(Some(job));
            }
            if tokio::time::timeout_at(deadline, notify.notified()).await.is_err() {
                return Ok(None);
            }
        }
    }

    /// Record a job's terminal outcome and release or cancel its dependents.
    pub async fn finish(&self, id: JobId, status: JobStatus) -> Result<(), QueueError> {
        if !status.is_terminal() {
            return Err(QueueError::WorkerError(format!(
                "cannot finish job {} with non-terminal status {:?}",
                id, status
            )));
        }

        let mut state = self.state.lock().await;
        if !state.active.contains_key(&id) {
            return Err(QueueError::JobNotFound(id.to_string()));
        }

        let mut released = Vec::new();
        let mut pending = vec![(id, status)];
        while let Some((job_id, outcome)) = pending.pop() {
            state.record_finished(job_id, outcome, self.config.finished_retention);
            let Some(waiting) = state.dependents.remove(&job_id) else {
                continue;
            };

            for mut dependent in waiting {
                if outcome.releases_dependents() {
                    debug!(job_id = %dependent.id, lane = %dependent.lane, "Releasing deferred job");
                    dependent.set_status(JobStatus::Queued);
                    state.active.insert(dependent.id, JobStatus::Queued);
                    let lane = dependent.lane.clone();
                    state.lane_mut(&lane)?.push_back(dependent);
                    released.push(lane);
                } else {
                    warn!(job_id = %dependent.id, lane = %dependent.lane, predecessor = %job_id, "Cancelling deferred job");
                    pending.push((dependent.id, JobStatus::Cancelled));
                }
            }
        }
        drop(state);

        for lane in released {
            self.notify(&lane);
        }
        Ok(())
    }

    /// Current status of a job, if the queue still knows about it.
    pub async fn status(&self, id: &JobId) -> Option<JobStatus> {
        let state = self.state.lock().await;
        state
            .active
            .get(id)
            .or_else(|| state.finished.get(id))
            .copied()
    }

    /// Number of jobs waiting in a lane and eligible to run.
    pub async fn count(&self, lane: &str) -> Result<usize, QueueError> {
        let state = self.state.lock().await;
        state
            .lanes
            .get(lane)
            .map(VecDeque::len)
            .ok_or_else(|| QueueError::UnknownLane(lane.to_string()))
    }

    /// Number of jobs for a lane still waiting on a predecessor.
    pub async fn deferred_count(&self, lane: &str) -> Result<usize, QueueError> {
        let state = self.state.lock().await;
        if !state.lanes.contains_key(lane) {
            return Err(QueueError::UnknownLane(lane.to_string()));
        }
        Ok(Self::deferred_in(&state, lane))
    }

    /// Number of jobs currently being processed.
    pub async fn running_count(&self) -> usize {
        let state = self.state.lock().await;
        state
            .active
            .values()
            .filter(|status| **status == JobStatus::Running)
            .count()
    }

    /// Mark a running job as failed without retry.
    ///
    /// Only the outcome is kept; the job itself is dropped.
    pub async fn fail(&self, job: Job, error: &str) -> Result<(), QueueError> {
        info!(job_id = %job.id, lane = %job.lane, "Job failed: {}", error);
        self.finish(job.id, JobStatus::Failed).await
    }

    /// Move a job to the dead letter queue.
    pub async fn move_to_dead_letter(&self, mut job: Job) -> Result<(), QueueError> {
        job.set_status(JobStatus::DeadLetter);
        info!(job_id = %job.id, lane = %job.lane, "Moving job to dead letter queue");
        self.finish(job.id, JobStatus::DeadLetter).await?;
        self.keep_dead_letter(job).await;
        Ok(())
    }

    async fn keep_dead_letter(&self, job: Job) {
        if !self.config.dead_letter_queue_enabled {
            return;
        }
        let mut state = self.state.lock().await;
        state.dead_letter.push_back(job);
        while state.dead_letter.len() > self.config.finished_retention {
            state.dead_letter.pop_front();
        }
    }

    /// Get dead letter queue contents.
    pub async fn dead_letter_queue(&self) -> Vec<Job> {
        self.state.lock().await.dead_letter.iter().cloned().collect()
    }

    /// Retry a job after the configured delay.
    ///
    /// Returns `false` when retries are exhausted and the job was dead-lettered.
    pub async fn retry(&self, mut job: Job, error: &str) -> Result<bool, QueueError> {
        job.retry_count += 1;
        job.last_error = Some(error.to_string());

        if !job.can_retry() {
            self.move_to_dead_letter(job).await?;
            return Ok(false);
        }

        let delay = chrono::Duration::seconds(self.config.retry_delay_secs as i64);
        job.scheduled_at = Some(Utc::now() + delay);
        job.set_status(JobStatus::Queued);
        let lane = job.lane.clone();

        let mut state = self.state.lock().await;
        debug!(job_id = %job.id, lane = %lane, attempt = job.retry_count, "Retrying job");
        state.active.insert(job.id, JobStatus::Queued);
        state.lane_mut(&lane)?.push_back(job);
        drop(state);

        self.notify(&lane);
        Ok(true)
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
