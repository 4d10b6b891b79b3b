//! HTTP capability implementation.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use tvresearch_config::CapabilityConfig;
use tvresearch_pipeline::{AccumulatedInputs, CapabilityError, StageCapability, StageKind};

use crate::api::{StageRequest, StageResponse};

const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Stage capability calling a remote research service.
pub struct HttpCapability {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpCapability {
    pub fn new(base_url: impl Into<String>) -> Result<Self, CapabilityError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a capability whose requests give up after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CapabilityError::Network(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            timeout,
            client,
        })
    }

    /// Send `Authorization: Bearer <key>` with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Build from configuration. Returns `None` when no base URL is set.
    pub fn from_config(config: &CapabilityConfig) -> Result<Option<Self>, CapabilityError> {
        let Some(base_url) = config.base_url.as_deref() else {
            return Ok(None);
        };
        let mut capability =
            Self::with_timeout(base_url, Duration::from_secs(config.timeout_secs))?;
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            capability = capability.with_api_key(key);
        }
        Ok(Some(capability))
    }

    fn endpoint(&self, stage: StageKind) -> String {
        format!("{}/{}", self.base_url, stage.lane())
    }
}

#[async_trait]
impl StageCapability for HttpCapability {
    async fn invoke(
        &self,
        stage: StageKind,
        inputs: &AccumulatedInputs,
    ) -> Result<String, CapabilityError> {
        let url = self.endpoint(stage);
        debug!(%stage, %url, "Calling research service");

        let body = StageRequest {
            stage: stage.lane(),
            inputs: inputs.to_map(),
        };
        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CapabilityError::Timeout {
                    stage,
                    millis: self.timeout.as_millis() as u64,
                }
            } else {
                CapabilityError::Network(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(CapabilityError::Api { status, message });
        }

        let parsed: StageResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::InvalidResponse(e.to_string()))?;
        parsed
            .output
            .ok_or_else(|| CapabilityError::InvalidResponse("missing output field".to_string()))
    }
}

#[cfg(test)]
#[path = "capability_tests.rs"]
mod tests;
