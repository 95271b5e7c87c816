//! Retrieval-augmented answering for employee questions.

pub mod composer;
pub mod pipeline;
pub mod queue;

pub use composer::{cited_sources, format_context, AnswerComposer, ComposerSettings};
pub use pipeline::{AnsweringPipeline, APOLOGY_MESSAGE, EMPTY_QUESTION_MESSAGE};
pub use queue::{AnswerHandle, AnswerQueue};
