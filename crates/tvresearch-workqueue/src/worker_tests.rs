use super::*;
use crate::config::QueueConfig;

struct TestHandler;

#[async_trait]
impl JobHandler for TestHandler {
    async fn handle(&self, _job: &Job) -> Result<(), QueueError> {
        Ok(())
    }
}

struct FailingHandler {
    retryable: bool,
}

#[async_trait]
impl JobHandler for FailingHandler {
    async fn handle(&self, _job: &Job) -> Result<(), QueueError> {
        if self.retryable {
            Err(QueueError::Database("store unavailable".to_string()))
        } else {
            Err(QueueError::ExecutionFailed("capability failed".to_string()))
        }
    }
}

fn queue_with(config: QueueConfig) -> JobQueue {
    JobQueue::new(config, ["lane"])
}

async fn dequeued(queue: &JobQueue, job: Job) -> Job {
    queue.enqueue("lane", job).await.unwrap();
    queue.dequeue("lane").await.unwrap().unwrap()
}

#[test]
fn test_worker_new() {
    let worker = Worker::new(1);
    assert_eq!(worker.id(), 1);
    assert!(!worker.is_running());
    assert_eq!(worker.jobs_completed(), 0);
}

#[tokio::test]
async fn test_worker_process_success() {
    let queue = queue_with(QueueConfig::default());
    let job = dequeued(&queue, Job::new("test", serde_json::Value::Null)).await;
    let id = job.id;
    let worker = Worker::new(1);

    let outcome = worker.process(job, &TestHandler, &queue).await.unwrap();
    assert_eq!(outcome, JobStatus::Completed);
    assert_eq!(worker.jobs_completed(), 1);
    assert_eq!(worker.jobs_failed(), 0);
    assert_eq!(queue.status(&id).await, Some(JobStatus::Completed));
}

#[tokio::test]
async fn test_worker_process_non_retryable_failure() {
    let queue = queue_with(QueueConfig::default());
    let job = dequeued(&queue, Job::new("test", serde_json::Value::Null)).await;
    let id = job.id;
    let worker = Worker::new(1);

    let outcome = worker
        .process(job, &FailingHandler { retryable: false }, &queue)
        .await
        .unwrap();
    assert_eq!(outcome, JobStatus::Failed);
    assert_eq!(worker.jobs_failed(), 1);
    assert_eq!(queue.status(&id).await, Some(JobStatus::Failed));
    assert_eq!(queue.count("lane").await.unwrap(), 0);
}

#[tokio::test]
async fn test_worker_process_retryable_failure() {
    let queue = queue_with(QueueConfig::default());
    let job = dequeued(&queue, Job::new("test", serde_json::Value::Null)).await;
    let worker = Worker::new(1);

    let outcome = worker
        .process(job, &FailingHandler { retryable: true }, &queue)
        .await
        .unwrap();
    assert_eq!(outcome, JobStatus::Queued);
    assert_eq!(queue.count("lane").await.unwrap(), 1);
}

#[tokio::test]
async fn test_worker_process_retries_exhausted() {
    let queue = queue_with(QueueConfig::default());
    let job = dequeued(
        &queue,
        Job::new("test", serde_json::Value::Null).with_max_retries(0),
    )
    .await;
    let worker = Worker::new(1);

    let outcome = worker
        .process(job, &FailingHandler { retryable: true }, &queue)
        .await
        .unwrap();
    assert_eq!(outcome, JobStatus::DeadLetter);
    assert_eq!(queue.dead_letter_queue().await.len(), 1);
}

#[test]
fn test_worker_pool_new() {
    let pool = WorkerPool::new("lane", 4);

    assert!(!pool.is_running());
    assert_eq!(pool.lane(), "lane");
    assert_eq!(pool.available_workers(), 4);
}

#[test]
fn test_worker_pool_needs_one_worker() {
    let pool = WorkerPool::new("lane", 0);
    assert_eq!(pool.available_workers(), 1);
}

#[tokio::test]
async fn test_worker_pool_submit_requires_start() {
    let pool = WorkerPool::new("lane", 1);
    let queue = Arc::new(queue_with(QueueConfig::default()));
    let job = dequeued(&queue, Job::new("test", serde_json::Value::Null)).await;

    let result = pool.submit(job, Arc::new(TestHandler), queue).await;
    assert!(matches!(result, Err(QueueError::WorkerError(_))));
}

#[tokio::test]
async fn test_worker_pool_run_loop_drains_lane() {
    let config = QueueConfig {
        poll_interval_ms: 10,
        ..Default::default()
    };
    let queue = Arc::new(queue_with(config));
    let pool = Arc::new(WorkerPool::new("lane", 2));
    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);

    let mut ids = Vec::new();
    for i in 0..3 {
        let id = queue
            .enqueue("lane", Job::new(format!("job-{}", i), serde_json::Value::Null))
            .await
            .unwrap();
        ids.push(id);
    }

    let handle = tokio::spawn(pool.clone().run_loop(queue.clone(), Arc::new(TestHandler), shutdown_rx));

    for _ in 0..100 {
        if pool.total_processed() == 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();

    assert_eq!(pool.total_processed(), 3);
    assert!(!pool.is_running());
    assert_eq!(queue.count("lane").await.unwrap(), 0);
    for id in ids {
        assert_eq!(queue.status(&id).await, Some(JobStatus::Completed));
    }
}
