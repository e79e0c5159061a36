//! LLM integration for mentor-match.
//!
//! The matchmaking agents talk to an OpenAI-compatible endpoint (a LiteLLM
//! or Ollama proxy in the default setup). rig-core provides the HTTP
//! transport and `RigAdapter` bridges rig's `CompletionModel` trait to our
//! `LlmProvider` trait, so tests can script the model's replies.

pub mod provider;
pub mod reasoning;
mod rig_adapter;

pub use provider::*;
pub use reasoning::{Reasoning, ReasoningContext, RespondOutput, RespondResult, TokenUsage};
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::error::LlmError;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    /// Any endpoint speaking the OpenAI chat completions format.
    OpenAiCompatible,
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub base_url: String,
    pub api_key: secrecy::SecretString,
    pub model: String,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.backend {
        LlmBackend::OpenAiCompatible => create_openai_compatible_provider(config),
    }
}

fn create_openai_compatible_provider(
    config: &LlmConfig,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::builder()
            .api_key(config.api_key.expose_secret())
            .base_url(&config.base_url)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: "openai-compatible".to_string(),
                reason: format!("Failed to create OpenAI-compatible client: {}", e),
            })?;

    // Proxies speak chat completions, not the Responses API.
    let model = client.completion_model(&config.model).completions_api();
    tracing::info!(
        "Using OpenAI-compatible endpoint {} (model: {})",
        config.base_url,
        config.model
    );
    Ok(Arc::new(RigAdapter::new(model, &config.model)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_constructs_without_network() {
        // rig-core clients accept any key at construction time; auth
        // failures surface on the first request.
        let config = LlmConfig {
            backend: LlmBackend::OpenAiCompatible,
            base_url: "http://127.0.0.1:4000/v1".to_string(),
            api_key: secrecy::SecretString::from("not-needed"),
            model: "llama3.2:1b".to_string(),
        };
        let provider = create_provider(&config);
        assert!(provider.is_ok());
        assert_eq!(provider.unwrap().model_name(), "llama3.2:1b");
    }
}
