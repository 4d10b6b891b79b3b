//! Queue configuration.

use serde::{Deserialize, Serialize};

/// Queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum retries for retryable job failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry delay in seconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// Maximum waiting jobs per lane (0 = unlimited).
    #[serde(default)]
    pub max_queue_size: u64,

    /// Idle wait before a worker re-checks its lane.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Dead letter queue enabled.
    #[serde(default = "default_dlq_enabled")]
    pub dead_letter_queue_enabled: bool,

    /// Number of finished job outcomes (and dead-lettered jobs) kept.
    #[serde(default = "default_finished_retention")]
    pub finished_retention: usize,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5
}

fn default_poll_interval() -> u64 {
    100
}

fn default_dlq_enabled() -> bool {
    true
}

fn default_finished_retention() -> usize {
    10_000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            max_queue_size: 0,
            poll_interval_ms: default_poll_interval(),
            dead_letter_queue_enabled: default_dlq_enabled(),
            finished_retention: default_finished_retention(),
        }
    }
}
