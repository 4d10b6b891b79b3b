//! Server initialization and startup logic.

use std::sync::{Arc, OnceLock};

use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tvresearch_api::{ApiConfig, ApiServer, AppState};
use tvresearch_capability_http::HttpCapability;
use tvresearch_config::{CapabilityConfig, Config, ConfigLoader, LoggingConfig};
use tvresearch_pipeline::{CapabilitySet, PipelineContext, PipelineSettings};

static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize tracing with console output and, when `logging.dir` is set,
/// a daily rolling log file.
pub(crate) fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match &logging.dir {
        Some(dir) => {
            let dir = ConfigLoader::expand_path(&dir.to_string_lossy());
            std::fs::create_dir_all(&dir)?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("tvresearch")
                .filename_suffix("log")
                .max_log_files(30)
                .build(&dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let _ = GUARD.set(guard);
            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(file_layer)
        .init();

    Ok(())
}

/// Build the stage capabilities from configuration.
///
/// Without a configured endpoint the set is empty and every stage fails
/// with a missing-capability error.
pub(crate) fn build_capabilities(
    config: &CapabilityConfig,
) -> Result<CapabilitySet, Box<dyn std::error::Error>> {
    match HttpCapability::from_config(config)? {
        Some(capability) => Ok(CapabilitySet::uniform(Arc::new(capability))),
        None => {
            warn!("No capability endpoint configured");
            Ok(CapabilitySet::new())
        }
    }
}

/// Run the API server and all stage workers until Ctrl-C.
pub(crate) async fn run_server(
    config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let api_config = ApiConfig::new(
        host.unwrap_or_else(|| config.server.host.clone()),
        port.unwrap_or(config.server.port),
    );

    let capabilities = build_capabilities(&config.capability)?;
    let context = PipelineContext::init(PipelineSettings::from_config(&config), capabilities).await?;
    let pools = context.start_workers().await;
    info!(pools, "Pipeline ready");

    let state = Arc::new(AppState::new(context.service()));
    let server = ApiServer::new(api_config, state);
    info!("Starting tvresearch on {}", server.addr());

    let result = server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        })
        .await;

    context.shutdown().await;
    info!(processed = context.processed_jobs().await, "tvresearch stopped");
    result
}
