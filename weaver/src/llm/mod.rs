//! LLM Client module for Weaver
//!
//! Provides model completion requests against a local Ollama server.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod ollama;
mod types;

pub use client::LlmClient;
pub use error::{LlmError, MAX_ERROR_BODY_CHARS};
pub use ollama::{OllamaClient, SKIP_BROWSER_WARNING_HEADER};
pub use types::{CompletionRequest, CompletionResponse, Message, Role};

use crate::config::LlmConfig;

/// Create an LLM client based on the provider specified in config
///
/// Configuration problems (unknown provider, empty base URL or model) are
/// reported before any network call.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "ollama" => {
            debug!("create_client: creating Ollama client");
            Ok(Arc::new(OllamaClient::from_config(config)?))
        }
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::Configuration(format!(
                "Unknown LLM provider: '{}'. Supported: ollama",
                other
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_ollama() {
        let client = create_client(&LlmConfig::default()).unwrap();
        assert_eq!(client.model(), "qwen2.5-coder:7b");
    }

    #[test]
    fn test_create_client_unknown_provider() {
        let config = LlmConfig {
            provider: "openai".to_string(),
            ..Default::default()
        };
        let err = create_client(&config).err().unwrap();
        assert!(matches!(err, LlmError::Configuration(_)));
        assert!(err.to_string().contains("openai"));
    }

    #[test]
    fn test_create_client_empty_model_fails_fast() {
        let config = LlmConfig {
            model: String::new(),
            ..Default::default()
        };
        assert!(matches!(create_client(&config), Err(LlmError::Configuration(_))));
    }
}
