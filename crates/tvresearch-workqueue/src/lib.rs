//! # tvresearch Work Queue
//!
//! Job broker for the staged research pipeline.
//!
//! ## Features
//!
//! - Named FIFO lanes, one per pipeline stage
//! - Jobs deferred until a predecessor job finishes
//! - Worker pool per lane with bounded concurrency
//! - Retry with delay and a dead letter queue

pub mod config;
pub mod error;
pub mod job;
pub mod queue;
pub mod worker;

pub use config::QueueConfig;
pub use error::QueueError;
pub use job::{Job, JobId, JobStatus};
pub use queue::JobQueue;
pub use worker::{JobHandler, Worker, WorkerPool};
