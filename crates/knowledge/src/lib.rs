//! Document knowledge for Handbook.
//!
//! Two halves share the vector index:
//!
//! - **Sync**: scan the documents tree (`<department>/<role>/...`), extract
//!   and chunk changed files, embed them and upsert them, recording each file
//!   in the manifest only once its points are written.
//! - **Answering**: embed a question, retrieve the closest chunks visible to
//!   the requester's role (their own role plus `general`), and compose a
//!   grounded answer with the completion model.

pub mod bootstrap;
pub mod chunker;
pub mod detector;
pub mod embeddings;
pub mod loader;
pub mod manifest;
pub mod progress;
pub mod rag;
pub mod retriever;
pub mod roles;
pub mod sync;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

pub use bootstrap::{
    build_answer_queue, build_embedder, build_index, build_pipeline, build_sync_orchestrator,
};
pub use detector::{ChangeDetector, ScanOutcome};
pub use embeddings::EmbeddingProvider;
pub use manifest::{Manifest, ManifestEntry};
pub use progress::{ProgressEvent, ProgressReporter, SyncPhase};
pub use rag::{AnswerHandle, AnswerQueue, AnsweringPipeline};
pub use retriever::Retriever;
pub use roles::RoleResolver;
pub use sync::{SyncOptions, SyncOrchestrator, SyncReport, SyncSettings};
pub use types::{AnswerResult, Chunk, ChunkMetadata, RetrievedChunk, SourceFile, GENERAL_ROLE};
pub use vector_index::{MemoryIndex, QdrantIndex, VectorIndex};
