//! One-shot workflow run.

use std::time::Duration;

use tracing::info;
use tvresearch_config::Config;
use tvresearch_pipeline::{ExternalState, PipelineContext, PipelineSettings};

use crate::server::build_capabilities;

/// Submit one workflow, drive it with in-process workers and print the
/// final report.
pub(crate) async fn run_once(
    config: Config,
    topic: Option<String>,
    poll_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let capabilities = build_capabilities(&config.capability)?;
    if !capabilities.is_complete() {
        return Err("a capability endpoint is required to run a workflow".into());
    }

    let context = PipelineContext::init(PipelineSettings::from_config(&config), capabilities).await?;
    context.start_workers().await;
    let service = context.service();

    let submitted = service.submit(topic).await?;
    let id = submitted.record.id;
    info!(record_id = id, "Submitted research workflow");

    let poll = Duration::from_secs(poll_secs.max(1));
    let mut last_label = "";
    let view = loop {
        let view = service.get(id).await?;
        if view.progress.label != last_label {
            last_label = view.progress.label;
            match view.progress.progress_percent {
                Some(percent) => println!("[{:>3}%] {}", percent, last_label),
                None => println!("[   -] {}", last_label),
            }
        }
        if view.record.is_terminal() {
            break view;
        }
        tokio::time::sleep(poll).await;
    };

    context.shutdown().await;

    match view.progress.state {
        ExternalState::Completed => {
            println!();
            println!("{}", view.record.result_content.as_deref().unwrap_or_default());
            if let Some(secs) = view.record.execution_time_seconds {
                println!();
                println!("Completed in {}s", secs);
            }
            Ok(())
        }
        _ => {
            let message = view
                .record
                .error_message
                .unwrap_or_else(|| "workflow failed".to_string());
            Err(format!("Research workflow {} failed: {}", id, message).into())
        }
    }
}
