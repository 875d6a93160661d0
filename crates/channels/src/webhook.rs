//! Webhook notifier.
//!
//! Posts the final answer of a run to an HTTP endpoint as `{"text": ...}`.

use std::time::Duration;

use async_trait::async_trait;
use dayloop_config::NotifyConfig;
use dayloop_core::channel::Notifier;
use dayloop_core::error::ChannelError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Body sent to the endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputPayload {
    pub text: String,
}

pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Build from the `[notify]` section; `None` when delivery is disabled.
    pub fn from_config(config: &NotifyConfig) -> Option<Self> {
        if !config.enabled || config.endpoint.trim().is_empty() {
            return None;
        }
        Some(Self::new(
            config.endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        ))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, answer: &str) -> Result<(), ChannelError> {
        let payload = OutputPayload {
            text: answer.to_string(),
        };
        debug!(endpoint = %self.endpoint, len = answer.len(), "Delivering answer");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChannelError::DeliveryFailed {
                channel: self.name().into(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::DeliveryFailed {
                channel: self.name().into(),
                reason: format!("endpoint answered {status}"),
            });
        }

        info!(endpoint = %self.endpoint, "Answer delivered");
        Ok(())
    }
}
