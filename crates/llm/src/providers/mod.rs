//! Completion provider implementations.

pub mod ollama;
pub mod openai;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockLlmClient;
