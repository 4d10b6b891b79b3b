//! Worker pool for job execution.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::error::QueueError;
use crate::job::{Job, JobStatus};
use crate::queue::JobQueue;

/// Job handler trait.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Execute a job.
    async fn handle(&self, job: &Job) -> Result<(), QueueError>;
}

/// A single worker.
pub struct Worker {
    id: u32,
    running: AtomicBool,
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
}

impl Worker {
    /// Create a new worker.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            running: AtomicBool::new(false),
            jobs_completed: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
        }
    }

    /// Get worker ID.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Check if worker is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get completed job count.
    pub fn jobs_completed(&self) -> u64 {
        self.jobs_completed.load(Ordering::SeqCst)
    }

    /// Get failed job count.
    pub fn jobs_failed(&self) -> u64 {
        self.jobs_failed.load(Ordering::SeqCst)
    }

    /// Process a dequeued job and record its outcome with the queue.
    ///
    /// Handler failures never propagate: retryable errors go back to the
    /// lane, everything else marks the job failed.
    pub async fn process<H: JobHandler + ?Sized>(
        &self,
        job: Job,
        handler: &H,
        queue: &JobQueue,
    ) -> Result<JobStatus, QueueError> {
        self.running.store(true, Ordering::SeqCst);
        debug!(worker = self.id, job_id = %job.id, lane = %job.lane, "Worker processing job");

        let outcome = match handler.handle(&job).await {
            Ok(()) => {
                self.jobs_completed.fetch_add(1, Ordering::SeqCst);
                debug!(worker = self.id, job_id = %job.id, "Worker completed job");
                queue.finish(job.id, JobStatus::Completed).await?;
                JobStatus::Completed
            }
            Err(e) if e.is_retryable() => {
                self.jobs_failed.fetch_add(1, Ordering::SeqCst);
                warn!(worker = self.id, job_id = %job.id, "Worker job attempt failed: {}", e);
                if queue.retry(job, &e.to_string()).await? {
                    JobStatus::Queued
                } else {
                    JobStatus::DeadLetter
                }
            }
            Err(e) => {
                self.jobs_failed.fetch_add(1, Ordering::SeqCst);
                error!(worker = self.id, job_id = %job.id, "Worker failed job: {}", e);
                queue.fail(job, &e.to_string()).await?;
                JobStatus::Failed
            }
        };

        self.running.store(false, Ordering::SeqCst);
        Ok(outcome)
    }
}

/// Worker pool serving a single lane.
pub struct WorkerPool {
    lane: String,
    max_workers: u32,
    semaphore: Arc<Semaphore>,
    running: Arc<AtomicBool>,
    next_worker_id: AtomicU32,
    total_processed: Arc<AtomicU64>,
}

impl WorkerPool {
    /// Create a new worker pool for a lane.
    pub fn new(lane: impl Into<String>, max_workers: u32) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            lane: lane.into(),
            max_workers,
            semaphore: Arc::new(Semaphore::new(max_workers as usize)),
            running: Arc::new(AtomicBool::new(false)),
            next_worker_id: AtomicU32::new(1),
            total_processed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Lane served by this pool.
    pub fn lane(&self) -> &str {
        &self.lane
    }

    /// Start the worker pool.
    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
        info!(lane = %self.lane, "Worker pool started with {} workers", self.max_workers);
    }

    /// Stop the worker pool.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        info!(lane = %self.lane, "Worker pool stopped");
    }

    /// Check if pool is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get total processed job count.
    pub fn total_processed(&self) -> u64 {
        self.total_processed.load(Ordering::SeqCst)
    }

    /// Get number of idle workers.
    pub fn available_workers(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Submit a dequeued job for execution.
    pub async fn submit<H: JobHandler + ?Sized + 'static>(
        &self,
        job: Job,
        handler: Arc<H>,
        queue: Arc<JobQueue>,
    ) -> Result<(), QueueError> {
        if !self.is_running() {
            return Err(QueueError::WorkerError("Pool is not running".to_string()));
        }

        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| QueueError::WorkerError(e.to_string()))?;

        let total_processed = self.total_processed.clone();
        let worker_id = self.next_worker_id.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            let worker = Worker::new(worker_id);
            match worker.process(job, handler.as_ref(), queue.as_ref()).await {
                Ok(_) => {
                    total_processed.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => error!(worker = worker_id, "Failed to record job outcome: {}", e),
            }

            drop(permit);
        });

        Ok(())
    }

    /// Run the pool in a loop, processing jobs from its lane until shutdown.
    pub async fn run_loop<H: JobHandler + ?Sized + 'static>(
        self: Arc<Self>,
        queue: Arc<JobQueue>,
        handler: Arc<H>,
        mut shutdown_rx: tokio::sync::broadcast::Receiver<()>,
    ) {
        self.start();
        let poll = Duration::from_millis(queue.config().poll_interval_ms.max(1));

        loop {
            // Only pull a job when a worker is free to take it.
            let permit = tokio::select! {
                _ = shutdown_rx.recv() => break,
                permit = self.semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let next = tokio::select! {
                _ = shutdown_rx.recv() => break,
                next = queue.dequeue_wait(&self.lane, poll) => next,
            };
            drop(permit);

            match next {
                Ok(Some(job)) => {
                    if let Err(e) = self.submit(job, handler.clone(), queue.clone()).await {
                        error!(lane = %self.lane, "Failed to submit job: {}", e);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    error!(lane = %self.lane, "Failed to dequeue job: {}", e);
                    tokio::time::sleep(poll).await;
                }
            }
        }

        info!(lane = %self.lane, "Worker pool shutting down");
        // Wait for in-flight jobs before reporting the pool as stopped.
        let _ = self.semaphore.acquire_many(self.max_workers).await;
        self.stop();
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
