//! Grounded answer generation from retrieved context.

use crate::types::{AnswerResult, RetrievedChunk};
use handbook_core::{bounded_call, AppConfig, AppResult, RetryPolicy};
use handbook_llm::{LlmClient, LlmRequest};
use handbook_prompt::{render_answer_prompt, PromptDefinition};
use std::sync::Arc;
use std::time::Duration;

const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone)]
pub struct ComposerSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.1,
            max_tokens: None,
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

impl ComposerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            timeout: config.timeouts.completion(),
            retry: config.timeouts.retry_policy(),
        }
    }
}

/// Render retrieved chunks as the prompt's context block, in rank order.
///
/// An empty slice renders as an empty string.
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| format!("Source: {}\n\nContent: {}", c.chunk.source(), c.chunk.text()))
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Distinct sources of `chunks`, first occurrence wins.
pub fn cited_sources(chunks: &[RetrievedChunk]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for chunk in chunks {
        if !sources.iter().any(|s| s == chunk.chunk.source()) {
            sources.push(chunk.chunk.source().to_string());
        }
    }
    sources
}

/// Builds the grounded prompt and asks the completion model for an answer.
#[derive(Clone)]
pub struct AnswerComposer {
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    settings: ComposerSettings,
}

impl std::fmt::Debug for AnswerComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerComposer")
            .field("provider", &self.llm.provider_name())
            .field("prompt", &self.prompt.id)
            .field("settings", &self.settings)
            .finish()
    }
}

impl AnswerComposer {
    pub fn new(llm: Arc<dyn LlmClient>, prompt: PromptDefinition, settings: ComposerSettings) -> Self {
        Self {
            llm,
            prompt,
            settings,
        }
    }

    /// Compose an answer to `question` from `chunks` under `core_values`.
    ///
    /// The model is called even when `chunks` is empty; the prompt then
    /// instructs it to give the not-found reply.
    pub async fn compose(
        &self,
        question: &str,
        requester_role: &str,
        chunks: &[RetrievedChunk],
        core_values: &str,
    ) -> AppResult<AnswerResult> {
        let context = format_context(chunks);
        let built = render_answer_prompt(&self.prompt, core_values, &context, question)?;

        let mut request = LlmRequest::new(built.user, &self.settings.model)
            .with_temperature(self.settings.temperature);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(max_tokens) = self.settings.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        tracing::debug!(
            role = %requester_role,
            chunks = chunks.len(),
            model = %self.settings.model,
            provider = self.llm.provider_name(),
            "Requesting grounded answer"
        );

        let llm = &self.llm;
        let request = &request;
        let response = bounded_call(
            "completion",
            self.settings.timeout,
            self.settings.retry,
            || llm.complete(request),
        )
        .await?;

        Ok(AnswerResult::new(
            response.content.trim(),
            cited_sources(chunks),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, ChunkMetadata};
    use handbook_core::AppError;
    use handbook_llm::MockLlmClient;
    use handbook_prompt::load_answer_prompt;

    fn retrieved(source: &str, text: &str, rank: usize) -> RetrievedChunk {
        RetrievedChunk {
            chunk: Chunk::new(text, 0, ChunkMetadata::new("finance", "general", source)),
            score: 1.0 / rank as f32,
            rank,
        }
    }

    fn composer(llm: MockLlmClient) -> AnswerComposer {
        AnswerComposer::new(
            Arc::new(llm),
            load_answer_prompt(None).unwrap(),
            ComposerSettings {
                retry: RetryPolicy::none(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_format_context() {
        let chunks = vec![
            retrieved("finance/general/a.pdf", "First.", 1),
            retrieved("finance/general/b.pdf", "Second.", 2),
        ];
        assert_eq!(
            format_context(&chunks),
            "Source: finance/general/a.pdf\n\nContent: First.\n\n---\n\nSource: finance/general/b.pdf\n\nContent: Second."
        );
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn test_cited_sources_are_distinct_in_rank_order() {
        let chunks = vec![
            retrieved("b.pdf", "1", 1),
            retrieved("a.pdf", "2", 2),
            retrieved("b.pdf", "3", 3),
        ];
        assert_eq!(cited_sources(&chunks), vec!["b.pdf", "a.pdf"]);
    }

    #[tokio::test]
    async fn test_compose_sends_grounded_prompt() {
        let llm = MockLlmClient::fixed("  Refunds take 48 hours.\nSources: finance/general/a.pdf ");
        let composer = composer(llm.clone());

        let answer = composer
            .compose(
                "How long do refunds take?",
                "marketing",
                &[retrieved("finance/general/a.pdf", "Refunds within 48 hours.", 1)],
                "Integrity first.",
            )
            .await
            .unwrap();

        assert!(answer.text.starts_with("Refunds take 48 hours."));
        assert_eq!(answer.cited_sources, vec!["finance/general/a.pdf"]);

        let request = &llm.requests()[0];
        assert_eq!(request.temperature, Some(0.1));
        assert!(request.prompt.contains("Integrity first."));
        assert!(request.prompt.contains("Content: Refunds within 48 hours."));
        assert!(request.prompt.contains("How long do refunds take?"));
    }

    #[tokio::test]
    async fn test_compose_with_empty_context_still_calls_model() {
        let llm = MockLlmClient::fixed(handbook_prompt::NOT_FOUND_MESSAGE);
        let composer = composer(llm.clone());

        let answer = composer.compose("Anything?", "general", &[], "v").await.unwrap();
        assert_eq!(answer.text, handbook_prompt::NOT_FOUND_MESSAGE);
        assert!(answer.cited_sources.is_empty());
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let composer = composer(MockLlmClient::failing(false));
        let err = composer.compose("q", "general", &[], "v").await.unwrap_err();
        assert!(matches!(err, AppError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_slow_model_times_out() {
        let llm = MockLlmClient::fixed("late").with_delay(Duration::from_secs(5));
        let composer = AnswerComposer::new(
            Arc::new(llm),
            load_answer_prompt(None).unwrap(),
            ComposerSettings {
                timeout: Duration::from_millis(20),
                retry: RetryPolicy::none(),
                ..Default::default()
            },
        );

        let err = composer.compose("q", "general", &[], "v").await.unwrap_err();
        assert!(matches!(err, AppError::Timeout { .. }));
    }
}
