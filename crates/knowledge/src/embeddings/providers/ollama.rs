//! Ollama embeddings via the local `/api/embeddings` endpoint.
//!
//! The endpoint takes one prompt per request, so batches are sent
//! sequentially.

use crate::embeddings::EmbeddingProvider;
use handbook_core::{AppError, AppResult, ProviderKind};
use handbook_llm::http;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            client: http::build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimensions,
            timeout,
        })
    }

    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed_single(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);

        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| http::transport_error(ProviderKind::Embedding, "ollama", self.timeout, e))?;

        if !response.status().is_success() {
            return Err(http::error_from_response(ProviderKind::Embedding, "ollama", response).await);
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            AppError::permanent(
                ProviderKind::Embedding,
                format!("Failed to parse Ollama response: {}", e),
            )
        })?;

        if body.embedding.len() != self.dimensions {
            return Err(AppError::permanent(
                ProviderKind::Embedding,
                format!(
                    "Ollama model '{}' returned {} dimensions, expected {}",
                    self.model,
                    body.embedding.len(),
                    self.dimensions
                ),
            ));
        }

        Ok(body.embedding)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_single(text).await?);
        }
        debug!(count = vectors.len(), "Generated Ollama embeddings");
        Ok(vectors)
    }
}
