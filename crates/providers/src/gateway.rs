//! Oracle gateway: one prompt in, one cleaned string out.
//!
//! The gateway owns the call budget: every provider call is raced against a
//! timeout and dropped when it loses. There is no retry here; a timeout is
//! reported to the caller like any other provider failure.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dayloop_core::error::ProviderError;
use dayloop_core::message::Message;
use dayloop_core::provider::{Provider, ProviderRequest};
use tracing::debug;

/// Default time allowed for a single oracle answer.
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct OracleGateway {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl OracleGateway {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask with the configured timeout.
    pub async fn ask(&self, prompt: &str) -> Result<String, ProviderError> {
        self.ask_with_timeout(prompt, self.timeout).await
    }

    /// Send `prompt` as a single user message and return the cleaned answer.
    pub async fn ask_with_timeout(
        &self,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let started = Instant::now();
        let response = tokio::time::timeout(timeout, self.provider.complete(request))
            .await
            .map_err(|_| ProviderError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            })??;

        debug!(
            provider = self.provider.name(),
            model = %response.model,
            duration_ms = started.elapsed().as_millis() as u64,
            "Oracle answered"
        );

        Ok(strip_code_fence(&response.message.content))
    }
}

/// Remove a surrounding ```` ```json ```` fence that models like to add.
pub fn strip_code_fence(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dayloop_core::provider::ProviderResponse;
    use std::sync::Mutex;

    struct FixedProvider {
        reply: String,
        delay: Duration,
        prompts: Mutex<Vec<String>>,
    }

    impl FixedProvider {
        fn new(reply: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.into(),
                delay,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            self.prompts
                .lock()
                .unwrap()
                .push(request.messages[0].content.clone());
            tokio::time::sleep(self.delay).await;
            Ok(ProviderResponse {
                message: Message::assistant(self.reply.clone()),
                usage: None,
                model: request.model,
            })
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl Provider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn complete(&self, _: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::AuthenticationFailed("bad key".into()))
        }
    }

    #[test]
    fn strips_json_fence() {
        let raw = "  ```json\n{\"final_iteration\": \"True\"}\n```  ";
        assert_eq!(strip_code_fence(raw), "{\"final_iteration\": \"True\"}");
    }

    #[test]
    fn leaves_plain_answer_alone() {
        assert_eq!(strip_code_fence("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn bare_fence_keeps_language_free_body() {
        // Only the ```json opener is recognised
        assert_eq!(strip_code_fence("```\n{}\n```"), "```\n{}");
    }

    #[tokio::test]
    async fn ask_sends_prompt_as_single_user_message() {
        let provider = FixedProvider::new("```json\n{}\n```", Duration::ZERO);
        let gateway = OracleGateway::new(provider.clone(), "gemini-2.0-flash");

        let answer = gateway.ask("Query: plan my day").await.unwrap();
        assert_eq!(answer, "{}");
        assert_eq!(
            provider.prompts.lock().unwrap().as_slice(),
            ["Query: plan my day".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_oracle_times_out() {
        let provider = FixedProvider::new("{}", Duration::from_secs(60));
        let gateway = OracleGateway::new(provider, "m").with_timeout(Duration::from_secs(10));

        match gateway.ask("hello").await {
            Err(ProviderError::Timeout { timeout_ms }) => assert_eq!(timeout_ms, 10_000),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_timeout_overrides_default() {
        let provider = FixedProvider::new("{}", Duration::from_secs(5));
        let gateway = OracleGateway::new(provider, "m");

        assert!(gateway.ask("hello").await.is_ok());
        assert!(matches!(
            gateway.ask_with_timeout("hello", Duration::from_secs(1)).await,
            Err(ProviderError::Timeout { timeout_ms: 1_000 })
        ));
    }

    #[tokio::test]
    async fn provider_errors_pass_through() {
        let gateway = OracleGateway::new(Arc::new(FailingProvider), "m");
        assert!(matches!(
            gateway.ask("hello").await,
            Err(ProviderError::AuthenticationFailed(_))
        ));
    }
}
