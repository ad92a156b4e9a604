//! LLM provider factory.
//!
//! Creates LLM clients from a provider name, resolving endpoints and
//! requiring credentials where the provider needs them.

use crate::client::LlmClient;
use crate::providers::{GeminiClient, OllamaClient};
use crate::types::ProviderType;
use std::sync::Arc;
use support_core::{AppConfig, AppError, AppResult};

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("gemini", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key (required for Gemini)
///
/// # Errors
/// `Config` for an unknown provider, `ConfigurationMissing` when a
/// provider that needs a key has none.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let kind = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;
    tracing::debug!(provider = kind.as_str(), endpoint = ?endpoint, "Creating LLM client");

    match kind {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or(crate::providers::ollama::DEFAULT_OLLAMA_URL);
            Ok(Arc::new(OllamaClient::with_base_url(base_url)))
        }
        ProviderType::Gemini => {
            let key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
                AppError::ConfigurationMissing("Gemini provider requires an API key".to_string())
            })?;
            let base_url = endpoint.unwrap_or(crate::providers::gemini::DEFAULT_GEMINI_URL);
            Ok(Arc::new(GeminiClient::with_base_url(base_url, key)))
        }
    }
}

/// Create the client for the configured active provider.
pub fn client_from_config(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    let api_key = config.resolve_api_key(&config.provider);
    create_client(
        &config.provider,
        config.provider_endpoint(),
        api_key.as_deref(),
    )
}
