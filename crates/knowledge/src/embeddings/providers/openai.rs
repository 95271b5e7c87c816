//! OpenAI embeddings (`POST {base}/embeddings`).

use crate::embeddings::EmbeddingProvider;
use handbook_core::{AppError, AppResult, ProviderKind};
use handbook_llm::http;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

pub struct OpenAiEmbedder {
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl OpenAiEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
            timeout,
            client: http::build_client(timeout)?,
        })
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(model = %self.model, batch = texts.len(), "Requesting OpenAI embeddings");

        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
                dimensions: self.dimensions,
            })
            .send()
            .await
            .map_err(|e| http::transport_error(ProviderKind::Embedding, "openai", self.timeout, e))?;

        if !response.status().is_success() {
            return Err(http::error_from_response(ProviderKind::Embedding, "openai", response).await);
        }

        let mut body: EmbeddingResponse = response.json().await.map_err(|e| {
            AppError::permanent(
                ProviderKind::Embedding,
                format!("Failed to parse OpenAI embeddings response: {}", e),
            )
        })?;

        if body.data.len() != texts.len() {
            return Err(AppError::permanent(
                ProviderKind::Embedding,
                format!(
                    "OpenAI returned {} embeddings for {} inputs",
                    body.data.len(),
                    texts.len()
                ),
            ));
        }

        body.data.sort_by_key(|d| d.index);
        body.data
            .into_iter()
            .map(|d| {
                if d.embedding.len() == self.dimensions {
                    Ok(d.embedding)
                } else {
                    Err(AppError::permanent(
                        ProviderKind::Embedding,
                        format!(
                            "Unexpected embedding dimensions: got {}, expected {}",
                            d.embedding.len(),
                            self.dimensions
                        ),
                    ))
                }
            })
            .collect()
    }
}
