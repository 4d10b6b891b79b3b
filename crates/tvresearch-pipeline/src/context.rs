//! Explicit wiring of the pipeline's shared handles.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tvresearch_config::Config;
use tvresearch_workqueue::{JobQueue, QueueConfig, WorkerPool};

use crate::coordinator::PipelineCoordinator;
use crate::error::{PipelineError, StoreError};
use crate::executor::{CapabilitySet, StageExecutor};
use crate::service::ResearchService;
use crate::stage::StageKind;
use crate::store::{MemoryRecordStore, RecordStore, SqliteRecordStore};

/// Where workflow records live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    SqliteInMemory,
    Sqlite(PathBuf),
}

/// Settings needed to assemble a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub store: StoreBackend,
    pub queue: QueueConfig,
    pub workers: BTreeMap<StageKind, u32>,
    pub stage_timeout: Option<Duration>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default()).with_store(StoreBackend::Memory)
    }
}

impl PipelineSettings {
    /// Derive settings from the application configuration.
    pub fn from_config(config: &Config) -> Self {
        let store = if config.database.is_in_memory() {
            StoreBackend::SqliteInMemory
        } else {
            StoreBackend::Sqlite(config.database.resolved_path())
        };

        let queue = QueueConfig {
            max_retries: config.queue.max_retries,
            retry_delay_secs: config.queue.retry_delay_secs,
            max_queue_size: config.queue.max_queue_size,
            poll_interval_ms: config.queue.poll_interval_ms,
            dead_letter_queue_enabled: config.queue.dead_letter_queue_enabled,
            ..QueueConfig::default()
        };

        let workers = StageKind::ALL
            .into_iter()
            .map(|stage| {
                let count = config.workers.for_lane(stage.lane()).unwrap_or(1);
                (stage, count)
            })
            .collect();

        let stage_timeout = match config.pipeline.stage_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Self {
            store,
            queue,
            workers,
            stage_timeout,
        }
    }

    pub fn with_store(mut self, store: StoreBackend) -> Self {
        self.store = store;
        self
    }

    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    /// Worker count for a stage's lane.
    pub fn workers_for(&self, stage: StageKind) -> u32 {
        self.workers.get(&stage).copied().unwrap_or(1).max(1)
    }

    fn executor(&self) -> StageExecutor {
        match self.stage_timeout {
            Some(timeout) => StageExecutor::new().with_timeout(timeout),
            None => StageExecutor::new(),
        }
    }
}

/// Open the configured record store.
pub async fn open_store(backend: &StoreBackend) -> Result<Arc<dyn RecordStore>, StoreError> {
    let store: Arc<dyn RecordStore> = match backend {
        StoreBackend::Memory => Arc::new(MemoryRecordStore::new()),
        StoreBackend::SqliteInMemory => Arc::new(SqliteRecordStore::in_memory().await?),
        StoreBackend::Sqlite(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::Database(e.to_string()))?;
            }
            Arc::new(SqliteRecordStore::open(path).await?)
        }
    };
    Ok(store)
}

/// The pipeline's store, broker, coordinator and worker pools.
pub struct PipelineContext {
    settings: PipelineSettings,
    store: Arc<dyn RecordStore>,
    queue: Arc<JobQueue>,
    coordinator: Arc<PipelineCoordinator>,
    shutdown_tx: broadcast::Sender<()>,
    pools: Mutex<Vec<Arc<WorkerPool>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl PipelineContext {
    /// Open the configured store and assemble the pipeline.
    pub async fn init(
        settings: PipelineSettings,
        capabilities: CapabilitySet,
    ) -> Result<Self, PipelineError> {
        let missing = capabilities.missing();
        if !missing.is_empty() {
            warn!(?missing, "Stages without a capability will fail");
        }
        let store = open_store(&settings.store).await?;
        Ok(Self::with_store(settings, store, capabilities))
    }

    /// Assemble the pipeline around an existing store.
    pub fn with_store(
        settings: PipelineSettings,
        store: Arc<dyn RecordStore>,
        capabilities: CapabilitySet,
    ) -> Self {
        let queue = Arc::new(JobQueue::new(
            settings.queue.clone(),
            StageKind::ALL.iter().map(StageKind::lane),
        ));
        let coordinator = Arc::new(PipelineCoordinator::new(
            store.clone(),
            queue.clone(),
            capabilities,
            settings.executor(),
        ));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            settings,
            store,
            queue,
            coordinator,
            shutdown_tx,
            pools: Mutex::new(Vec::new()),
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn store(&self) -> Arc<dyn RecordStore> {
        self.store.clone()
    }

    pub fn queue(&self) -> Arc<JobQueue> {
        self.queue.clone()
    }

    pub fn coordinator(&self) -> Arc<PipelineCoordinator> {
        self.coordinator.clone()
    }

    /// Intake and query service over this pipeline.
    pub fn service(&self) -> ResearchService {
        ResearchService::new(self.store.clone(), self.queue.clone(), self.coordinator.clone())
    }

    /// Spawn one worker pool per stage lane. Returns the number of pools.
    pub async fn start_workers(&self) -> usize {
        let mut pools = self.pools.lock().await;
        if !pools.is_empty() {
            warn!("Worker pools already started");
            return pools.len();
        }

        let mut handles = self.handles.lock().await;
        for stage in StageKind::ALL {
            let pool = Arc::new(WorkerPool::new(stage.lane(), self.settings.workers_for(stage)));
            handles.push(tokio::spawn(pool.clone().run_loop(
                self.queue.clone(),
                self.coordinator.clone(),
                self.shutdown_tx.subscribe(),
            )));
            pools.push(pool);
        }

        info!(pools = pools.len(), "Pipeline workers started");
        pools.len()
    }

    /// Total jobs processed by all worker pools.
    pub async fn processed_jobs(&self) -> u64 {
        let pools = self.pools.lock().await;
        pools.iter().map(|pool| pool.total_processed()).sum()
    }

    /// Signal every worker pool and wait for in-flight jobs to finish.
    pub async fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = self.handles.lock().await.drain(..).collect();
        if handles.is_empty() {
            return;
        }

        info!("Shutting down pipeline workers");
        let _ = self.shutdown_tx.send(());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Worker pool task ended abnormally: {}", e);
            }
        }
        info!("Pipeline workers stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_default_config() {
        let settings = PipelineSettings::from_config(&Config::default());
        assert!(matches!(settings.store, StoreBackend::Sqlite(_)));
        assert_eq!(settings.workers_for(StageKind::TrendResearch), 2);
        assert_eq!(settings.workers_for(StageKind::FinalReporting), 1);
        assert_eq!(settings.queue.max_retries, 3);
        assert!(settings.stage_timeout.is_none());
    }

    #[test]
    fn test_settings_in_memory_database() {
        let mut config = Config::default();
        config.database.path = ":memory:".to_string();
        config.pipeline.stage_timeout_secs = 30;

        let settings = PipelineSettings::from_config(&config);
        assert_eq!(settings.store, StoreBackend::SqliteInMemory);
        assert_eq!(settings.stage_timeout, Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_init_creates_database_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("research.db");
        let settings = PipelineSettings::default().with_store(StoreBackend::Sqlite(path.clone()));

        let context = PipelineContext::init(settings, CapabilitySet::new()).await.unwrap();
        context.store().create(None).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_start_and_shutdown_workers() {
        let context = PipelineContext::with_store(
            PipelineSettings::default(),
            Arc::new(MemoryRecordStore::new()),
            CapabilitySet::new(),
        );

        assert_eq!(context.start_workers().await, 4);
        assert_eq!(context.start_workers().await, 4);
        context.shutdown().await;
        assert_eq!(context.processed_jobs().await, 0);
        // A second shutdown has nothing left to wait for.
        context.shutdown().await;
    }
}
