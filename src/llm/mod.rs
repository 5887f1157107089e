//! LLM integration for the Pharmesol agent.
//!
//! One backend is supported: the OpenAI chat completions API (or any
//! gateway speaking the same contract), reached over `reqwest`. The engine
//! only sees the `LlmProvider` trait, so tests swap in scripted providers.

mod openai;
pub mod provider;

pub use openai::OpenAiProvider;
pub use provider::*;

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::LlmError;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl LlmConfig {
    /// Build from the environment. Returns `None` when `OPENAI_API_KEY` is
    /// absent, which puts every call into manual-only mode.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())?;

        let model = lookup("PHARMESOL_MODEL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let base_url = lookup("PHARMESOL_OPENAI_BASE_URL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Some(Self {
            api_key: SecretString::from(api_key),
            model,
            base_url,
            timeout: Duration::from_secs(30),
        })
    }
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider = OpenAiProvider::new(
        config.api_key.clone(),
        &config.model,
        &config.base_url,
        config.timeout,
    )?;
    tracing::info!("Using OpenAI (model: {})", config.model);
    Ok(Arc::new(provider))
}

/// Send a tiny request to confirm the provider is reachable and the key is
/// accepted. Any failure means the agent should run in manual mode.
pub async fn probe(provider: &dyn LlmProvider) -> bool {
    let request = CompletionRequest::new(vec![ChatMessage::user("test")]).with_max_tokens(5);
    match provider.complete(request).await {
        Ok(_) => {
            tracing::info!(model = provider.model_name(), "LLM connection successful");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM not available, using manual mode");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    #[test]
    fn config_requires_api_key() {
        assert!(LlmConfig::from_lookup(|_| None).is_none());
        assert!(
            LlmConfig::from_lookup(|key| (key == "OPENAI_API_KEY").then(|| "   ".to_string()))
                .is_none()
        );
    }

    #[test]
    fn config_defaults_model_and_url() {
        let config =
            LlmConfig::from_lookup(|key| (key == "OPENAI_API_KEY").then(|| "sk-test".to_string()))
                .unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn create_provider_reports_model() {
        let config = LlmConfig {
            api_key: SecretString::from("sk-test"),
            model: "gpt-4o".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(5),
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "gpt-4o");
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmProvider for FailingLlm {
        fn model_name(&self) -> &str {
            "failing"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            Err(LlmError::AuthFailed {
                provider: "mock".into(),
            })
        }
    }

    struct EchoLlm;

    #[async_trait]
    impl LlmProvider for EchoLlm {
        fn model_name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse {
                content: request.messages[0].content.clone(),
                input_tokens: 1,
                output_tokens: 1,
                finish_reason: FinishReason::Stop,
                response_id: None,
            })
        }
    }

    #[tokio::test]
    async fn probe_reflects_provider_health() {
        assert!(!probe(&FailingLlm).await);
        assert!(probe(&EchoLlm).await);
    }
}
