//! Role-filtered semantic retrieval.

use crate::embeddings::EmbeddingProvider;
use crate::types::RetrievedChunk;
use crate::vector_index::{RoleFilter, VectorIndex};
use handbook_core::{bounded_call, AppConfig, AppResult, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetrieverSettings {
    pub top_k: usize,
    pub embed_timeout: Duration,
    pub index_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for RetrieverSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            embed_timeout: Duration::from_secs(30),
            index_timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
        }
    }
}

impl RetrieverSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            top_k: config.retrieval.top_k,
            embed_timeout: config.timeouts.embedding(),
            index_timeout: config.timeouts.index(),
            retry: config.timeouts.retry_policy(),
        }
    }
}

/// Finds the chunks most similar to a question among those the requester may see.
///
/// Only chunks whose role is the requester's role or `general` are returned.
/// The index applies the filter; results are checked again here before they
/// leave the retriever.
#[derive(Debug, Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    settings: RetrieverSettings,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        settings: RetrieverSettings,
    ) -> Self {
        Self {
            embedder,
            index,
            settings,
        }
    }

    pub fn top_k(&self) -> usize {
        self.settings.top_k
    }

    /// Up to `top_k` chunks ordered by score, then source, then position.
    #[tracing::instrument(skip(self, question), fields(role = %requester_role))]
    pub async fn retrieve(
        &self,
        question: &str,
        requester_role: &str,
    ) -> AppResult<Vec<RetrievedChunk>> {
        let embedder = &self.embedder;
        let index = &self.index;

        let vector = bounded_call(
            "embed question",
            self.settings.embed_timeout,
            self.settings.retry,
            || embedder.embed(question),
        )
        .await?;

        let filter = RoleFilter::for_requester(requester_role);
        let filter_ref = &filter;
        let vector_ref = vector.as_slice();
        let limit = self.settings.top_k;

        let mut hits = bounded_call(
            "search",
            self.settings.index_timeout,
            self.settings.retry,
            || index.search(vector_ref, filter_ref, limit),
        )
        .await?;

        let before = hits.len();
        hits.retain(|hit| filter.matches(hit.chunk.role()));
        if hits.len() != before {
            tracing::warn!(
                dropped = before - hits.len(),
                "Index returned chunks outside the requester's roles"
            );
        }

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.chunk.source().cmp(b.chunk.source()))
                .then_with(|| a.chunk.position().cmp(&b.chunk.position()))
        });
        hits.truncate(limit);

        let retrieved: Vec<RetrievedChunk> = hits
            .into_iter()
            .enumerate()
            .map(|(i, hit)| RetrievedChunk {
                chunk: hit.chunk,
                score: hit.score,
                rank: i + 1,
            })
            .collect();

        tracing::debug!(chunks = retrieved.len(), top_k = limit, "Retrieved context");
        Ok(retrieved)
    }
}
