//! Completion provider factory.
//!
//! Resolves the configured provider, injects its secret from the environment
//! and builds the client behind an `Arc<dyn LlmClient>`.

use crate::client::LlmClient;
use crate::providers::{ollama, openai, OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use handbook_core::config::CompletionSettings;
use handbook_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create a completion client from settings.
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or its API key
/// environment variable is unset.
pub fn create_client(
    settings: &CompletionSettings,
    timeout: Duration,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider = ProviderType::parse(&settings.provider).ok_or_else(|| {
        AppError::Config(format!("Unknown completion provider: {}", settings.provider))
    })?;

    tracing::debug!(%provider, model = %settings.model, "Creating completion client");

    match provider {
        ProviderType::Ollama => {
            let base_url = settings
                .endpoint
                .as_deref()
                .unwrap_or(ollama::DEFAULT_OLLAMA_URL);
            Ok(Arc::new(OllamaClient::new(base_url, timeout)?))
        }
        ProviderType::OpenAI => {
            let api_key = AppConfig::resolve_secret(&settings.api_key_env).ok_or_else(|| {
                AppError::Config(format!(
                    "OpenAI provider requires API key in {}",
                    settings.api_key_env
                ))
            })?;
            let base_url = settings
                .endpoint
                .as_deref()
                .unwrap_or(openai::DEFAULT_OPENAI_URL);
            Ok(Arc::new(OpenAiClient::new(base_url, api_key, timeout)?))
        }
    }
}
