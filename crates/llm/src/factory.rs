//! LLM provider factory.
//!
//! Builds a generation client from the `generation` section of the
//! application configuration.

use crate::client::LlmClient;
use crate::providers::ollama::DEFAULT_OLLAMA_URL;
use crate::providers::{GeminiClient, OllamaClient};
use crate::types::ProviderType;
use medrag_core::config::GenerationConfig;
use medrag_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client for the configured provider.
///
/// # Arguments
/// * `config` - Generation settings (provider, endpoint, timeout)
/// * `api_key` - Resolved API key, required by Gemini
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required
/// API key is missing.
pub fn create_client(
    config: &GenerationConfig,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider = ProviderType::parse(&config.provider).ok_or_else(|| {
        AppError::Config(format!("Unknown generation provider: {}", config.provider))
    })?;

    let timeout = Duration::from_secs(config.timeout_secs.max(1));

    match provider {
        ProviderType::Gemini => {
            let key = api_key.filter(|key| !key.trim().is_empty()).ok_or_else(|| {
                AppError::Config(format!(
                    "Gemini provider requires an API key (set {} or MEDRAG_API_KEY)",
                    config.api_key_env
                ))
            })?;
            Ok(Arc::new(GeminiClient::new(&config.endpoint, key, timeout)?))
        }
        ProviderType::Ollama => {
            // The default endpoint targets Gemini; fall back to the local runtime
            let endpoint = if config.endpoint == GenerationConfig::default().endpoint {
                DEFAULT_OLLAMA_URL
            } else {
                config.endpoint.as_str()
            };
            Ok(Arc::new(OllamaClient::new(endpoint, timeout)?))
        }
    }
}
