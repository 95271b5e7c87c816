//! Embedding providers.
//!
//! Sync and retrieval only see the `EmbeddingProvider` trait; the concrete
//! provider is picked from configuration by `create_provider`.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{OllamaEmbedder, OpenAiEmbedder, TrigramEmbedder};
