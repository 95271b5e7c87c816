//! Embedding provider trait and factory.

use super::providers::{OllamaEmbedder, OpenAiEmbedder, TrigramEmbedder};
use handbook_core::config::EmbeddingSettings;
use handbook_core::{AppConfig, AppError, AppResult, ProviderKind};
use handbook_llm::providers::ollama::DEFAULT_OLLAMA_URL;
use handbook_llm::providers::openai::DEFAULT_OPENAI_URL;
use std::sync::Arc;
use std::time::Duration;

/// Turns text into fixed-length vectors.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Provider name (e.g., "openai", "ollama", "trigram")
    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;

    /// Length of every vector this provider returns
    fn dimensions(&self) -> usize;

    /// Embed `texts`, returning one vector per input in the same order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results.pop().ok_or_else(|| {
            AppError::permanent(ProviderKind::Embedding, "No embedding returned")
        })
    }
}

/// Build the provider named in `settings`.
///
/// `timeout` bounds every HTTP request the provider makes.
pub fn create_provider(
    settings: &EmbeddingSettings,
    timeout: Duration,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match settings.provider.as_str() {
        "openai" => {
            let api_key = AppConfig::resolve_secret(&settings.api_key_env).ok_or_else(|| {
                AppError::Config(format!(
                    "OpenAI embeddings require the {} environment variable",
                    settings.api_key_env
                ))
            })?;
            let base_url = settings.endpoint.as_deref().unwrap_or(DEFAULT_OPENAI_URL);
            Ok(Arc::new(OpenAiEmbedder::new(
                base_url,
                api_key,
                &settings.model,
                settings.dimensions,
                timeout,
            )?))
        }

        "ollama" => {
            let base_url = settings.endpoint.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
            Ok(Arc::new(OllamaEmbedder::new(
                base_url,
                &settings.model,
                settings.dimensions,
                timeout,
            )?))
        }

        "trigram" => Ok(Arc::new(TrigramEmbedder::new(settings.dimensions))),

        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: openai, ollama, trigram",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: &str) -> EmbeddingSettings {
        EmbeddingSettings {
            provider: provider.to_string(),
            dimensions: 64,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_trigram_provider() {
        let provider = create_provider(&settings("trigram"), Duration::from_secs(1)).unwrap();
        assert_eq!(provider.provider_name(), "trigram");
        assert_eq!(provider.dimensions(), 64);
        assert_eq!(provider.embed("leave policy").await.unwrap().len(), 64);
    }

    #[test]
    fn test_create_ollama_provider() {
        let provider = create_provider(&settings("ollama"), Duration::from_secs(1)).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
    }

    #[test]
    fn test_openai_requires_key() {
        let mut s = settings("openai");
        s.api_key_env = "HANDBOOK_TEST_UNSET_EMBEDDING_KEY".to_string();
        let err = create_provider(&s, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_create_unknown_provider() {
        let err = create_provider(&settings("gguf"), Duration::from_secs(1)).unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }
}
