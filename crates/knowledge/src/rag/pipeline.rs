//! Question answering: role resolution, retrieval and composition.

use super::composer::AnswerComposer;
use crate::retriever::Retriever;
use crate::roles::RoleResolver;
use crate::types::AnswerResult;
use handbook_core::AppResult;

/// Reply for any failure on the answering path. Error details go to the logs.
pub const APOLOGY_MESSAGE: &str =
    "Sorry, I encountered an error while processing your request. Please try again later.";

/// Reply for an empty or blank question.
pub const EMPTY_QUESTION_MESSAGE: &str = "Please ask a question.";

/// Answers employee questions from the documents visible to their role.
///
/// Holds only shared, read-only capabilities, so one pipeline can serve any
/// number of concurrent questions, and dropping an in-flight answer is safe.
#[derive(Debug, Clone)]
pub struct AnsweringPipeline {
    retriever: Retriever,
    composer: AnswerComposer,
    roles: RoleResolver,
    core_values: String,
}

impl AnsweringPipeline {
    pub fn new(
        retriever: Retriever,
        composer: AnswerComposer,
        roles: RoleResolver,
        core_values: impl Into<String>,
    ) -> Self {
        Self {
            retriever,
            composer,
            roles,
            core_values: core_values.into(),
        }
    }

    /// Retrieve context for `requester_role` and compose an answer.
    ///
    /// `requester_role` is used as given; see [`Self::handle_question`] for
    /// the normalizing entry point.
    pub async fn answer(&self, question: &str, requester_role: &str) -> AppResult<AnswerResult> {
        let chunks = self.retriever.retrieve(question, requester_role).await?;
        if chunks.is_empty() {
            tracing::info!(role = %requester_role, "No accessible context for question");
        }

        self.composer
            .compose(question, requester_role, &chunks, &self.core_values)
            .await
    }

    /// Answer a question and always return text to show the employee.
    pub async fn handle_question(&self, question: &str, requester_role: Option<&str>) -> String {
        let question = question.trim();
        if question.is_empty() {
            return EMPTY_QUESTION_MESSAGE.to_string();
        }

        let role = self.roles.resolve(requester_role);
        match self.answer(question, &role).await {
            Ok(result) => {
                tracing::info!(
                    role = %role,
                    sources = result.cited_sources.len(),
                    "Answered question"
                );
                result.text
            }
            Err(e) => {
                tracing::error!(role = %role, error = %e, "Failed to answer question");
                APOLOGY_MESSAGE.to_string()
            }
        }
    }
}
