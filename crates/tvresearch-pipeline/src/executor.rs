//! Stage execution against pluggable capabilities.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{CapabilityError, PipelineError};
use crate::inputs::AccumulatedInputs;
use crate::stage::StageKind;

/// The research work behind a stage.
///
/// Implementations take the accumulated inputs and return the stage's text
/// output. They must not touch workflow state.
#[async_trait]
pub trait StageCapability: Send + Sync {
    async fn invoke(
        &self,
        stage: StageKind,
        inputs: &AccumulatedInputs,
    ) -> Result<String, CapabilityError>;
}

/// Capability backed by a synchronous closure.
pub struct FnCapability<F> {
    func: F,
}

impl<F> FnCapability<F>
where
    F: Fn(StageKind, &AccumulatedInputs) -> Result<String, CapabilityError> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> StageCapability for FnCapability<F>
where
    F: Fn(StageKind, &AccumulatedInputs) -> Result<String, CapabilityError> + Send + Sync,
{
    async fn invoke(
        &self,
        stage: StageKind,
        inputs: &AccumulatedInputs,
    ) -> Result<String, CapabilityError> {
        (self.func)(stage, inputs)
    }
}

/// One capability per stage.
#[derive(Clone, Default)]
pub struct CapabilitySet {
    capabilities: HashMap<StageKind, Arc<dyn StageCapability>>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the same capability for every stage.
    pub fn uniform(capability: Arc<dyn StageCapability>) -> Self {
        let capabilities = StageKind::ALL
            .into_iter()
            .map(|stage| (stage, capability.clone()))
            .collect();
        Self { capabilities }
    }

    /// Register the capability for a stage, replacing any previous one.
    pub fn with(mut self, stage: StageKind, capability: Arc<dyn StageCapability>) -> Self {
        self.capabilities.insert(stage, capability);
        self
    }

    /// Capability registered for a stage.
    pub fn get(&self, stage: StageKind) -> Result<Arc<dyn StageCapability>, CapabilityError> {
        self.capabilities
            .get(&stage)
            .cloned()
            .ok_or(CapabilityError::Missing(stage))
    }

    /// Stages with no capability registered.
    pub fn missing(&self) -> Vec<StageKind> {
        StageKind::ALL
            .into_iter()
            .filter(|stage| !self.capabilities.contains_key(stage))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

/// Runs a single stage's capability.
#[derive(Debug, Clone, Default)]
pub struct StageExecutor {
    timeout: Option<Duration>,
}

impl StageExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail stages that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Invoke `capability` for `stage` and return its output.
    pub async fn execute(
        &self,
        capability: &dyn StageCapability,
        stage: StageKind,
        inputs: &AccumulatedInputs,
    ) -> Result<String, PipelineError> {
        debug!(%stage, "Invoking stage capability");
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, capability.invoke(stage, inputs))
                .await
                .unwrap_or(Err(CapabilityError::Timeout {
                    stage,
                    millis: limit.as_millis() as u64,
                })),
            None => capability.invoke(stage, inputs).await,
        };

        match result {
            Ok(output) if output.trim().is_empty() => Err(PipelineError::Capability {
                stage,
                source: CapabilityError::EmptyOutput(stage),
            }),
            Ok(output) => Ok(output),
            Err(source) => Err(PipelineError::Capability { stage, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::RequestParameters;

    fn inputs() -> AccumulatedInputs {
        AccumulatedInputs::new(RequestParameters::for_topic(Some("AI")))
    }

    struct SlowCapability;

    #[async_trait]
    impl StageCapability for SlowCapability {
        async fn invoke(
            &self,
            _stage: StageKind,
            _inputs: &AccumulatedInputs,
        ) -> Result<String, CapabilityError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("late".to_string())
        }
    }

    #[tokio::test]
    async fn test_execute_returns_output() {
        let capability = FnCapability::new(|stage, inputs: &AccumulatedInputs| {
            Ok(format!("{} for {}", stage, inputs.request.channel_type))
        });
        let output = StageExecutor::new()
            .execute(&capability, StageKind::TrendResearch, &inputs())
            .await
            .unwrap();
        assert_eq!(output, "trend_research for Special Report on AI");
    }

    #[tokio::test]
    async fn test_execute_wraps_failure() {
        let capability =
            FnCapability::new(|_, _: &AccumulatedInputs| Err(CapabilityError::Failed("quota".into())));
        let err = StageExecutor::new()
            .execute(&capability, StageKind::NewsAggregation, &inputs())
            .await
            .unwrap_err();

        match err {
            PipelineError::Capability { stage, source } => {
                assert_eq!(stage, StageKind::NewsAggregation);
                assert_eq!(source.to_string(), "quota");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_output_is_failure() {
        let capability = FnCapability::new(|_, _: &AccumulatedInputs| Ok("  ".to_string()));
        let err = StageExecutor::new()
            .execute(&capability, StageKind::ContentStrategy, &inputs())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Capability {
                source: CapabilityError::EmptyOutput(_),
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let executor = StageExecutor::new().with_timeout(Duration::from_secs(5));
        let err = executor
            .execute(&SlowCapability, StageKind::FinalReporting, &inputs())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Capability {
                source: CapabilityError::Timeout { millis: 5000, .. },
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_second_timeout_reports_millis() {
        let executor = StageExecutor::new().with_timeout(Duration::from_millis(250));
        let err = executor
            .execute(&SlowCapability, StageKind::TrendResearch, &inputs())
            .await
            .unwrap_err();
        match err {
            PipelineError::Capability { source, .. } => {
                assert_eq!(source.to_string(), "Stage trend_research timed out after 250ms");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_capability_set() {
        let capability: Arc<dyn StageCapability> =
            Arc::new(FnCapability::new(|_, _: &AccumulatedInputs| Ok("x".to_string())));

        let partial = CapabilitySet::new().with(StageKind::TrendResearch, capability.clone());
        assert!(!partial.is_complete());
        assert_eq!(partial.missing().len(), 3);
        assert!(matches!(
            partial.get(StageKind::FinalReporting),
            Err(CapabilityError::Missing(StageKind::FinalReporting))
        ));

        let full = CapabilitySet::uniform(capability);
        assert!(full.is_complete());
        assert!(full.get(StageKind::FinalReporting).is_ok());
    }
}
