//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_true() -> bool {
    true
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub workers: WorkersConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub capability: CapabilityConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Record store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file. `:memory:` keeps everything in process.
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl DatabaseConfig {
    /// Whether the configured database lives only in memory.
    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }

    /// Database path with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).to_string())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "./data/tv_research.db".to_string()
}

/// Queue broker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum jobs waiting per lane (0 = unlimited).
    #[serde(default)]
    pub max_queue_size: u64,

    /// Worker-level retries for retryable job failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before a retried job becomes eligible again.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// How long an idle worker waits before re-checking its lane.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Whether exhausted jobs are kept in the dead letter queue.
    #[serde(default = "default_true")]
    pub dead_letter_queue_enabled: bool,
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

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 0,
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            poll_interval_ms: default_poll_interval(),
            dead_letter_queue_enabled: default_true(),
        }
    }
}

/// Number of concurrent workers per stage lane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersConfig {
    #[serde(default = "default_two")]
    pub trend_research: u32,

    #[serde(default = "default_two")]
    pub news_aggregation: u32,

    #[serde(default = "default_one")]
    pub content_strategy: u32,

    #[serde(default = "default_one")]
    pub final_reporting: u32,
}

impl WorkersConfig {
    /// Worker counts keyed by lane name.
    pub fn lanes(&self) -> [(&'static str, u32); 4] {
        [
            ("trend_research", self.trend_research),
            ("news_aggregation", self.news_aggregation),
            ("content_strategy", self.content_strategy),
            ("final_reporting", self.final_reporting),
        ]
    }

    /// Worker count for a lane, if the lane is known.
    pub fn for_lane(&self, lane: &str) -> Option<u32> {
        self.lanes()
            .into_iter()
            .find(|(name, _)| *name == lane)
            .map(|(_, count)| count)
    }
}

fn default_one() -> u32 {
    1
}

fn default_two() -> u32 {
    2
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            trend_research: default_two(),
            news_aggregation: default_two(),
            content_strategy: default_one(),
            final_reporting: default_one(),
        }
    }
}

/// Pipeline execution configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound on a single stage capability call (0 = no limit).
    #[serde(default)]
    pub stage_timeout_secs: u64,
}

/// Remote capability endpoint used for stage work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityConfig {
    /// Base URL; each stage posts to `{base_url}/{lane}`.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_capability_timeout")]
    pub timeout_secs: u64,
}

fn default_capability_timeout() -> u64 {
    300
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: default_capability_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for daily rolling log files.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            dir: None,
        }
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
