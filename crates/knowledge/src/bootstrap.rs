//! Construction of the sync and answering capabilities from configuration.

use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::rag::{AnswerComposer, AnswerQueue, AnsweringPipeline, ComposerSettings};
use crate::retriever::{Retriever, RetrieverSettings};
use crate::roles::RoleResolver;
use crate::sync::{SyncOrchestrator, SyncSettings};
use crate::vector_index::{MemoryIndex, QdrantIndex, VectorIndex};
use handbook_core::{AppConfig, AppError, AppResult};
use handbook_prompt::load_answer_prompt;
use std::path::PathBuf;
use std::sync::Arc;

pub fn build_embedder(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    create_provider(&config.embedding, config.timeouts.embedding())
}

/// Snapshot file used by the `memory` backend.
pub fn memory_snapshot_path(config: &AppConfig) -> PathBuf {
    config
        .handbook_dir()
        .join("index")
        .join(format!("{}.json", config.index.collection))
}

pub fn build_index(config: &AppConfig) -> AppResult<Arc<dyn VectorIndex>> {
    match config.index.backend.as_str() {
        "qdrant" => Ok(Arc::new(QdrantIndex::connect(
            &config.index.url,
            AppConfig::resolve_secret(&config.index.api_key_env),
            &config.index.collection,
            config.timeouts.index(),
        )?)),
        "memory" => Ok(Arc::new(MemoryIndex::with_snapshot(
            &config.index.collection,
            memory_snapshot_path(config),
        )?)),
        other => Err(AppError::Config(format!("Unknown index backend: {}", other))),
    }
}

pub fn build_sync_orchestrator(config: &AppConfig) -> AppResult<SyncOrchestrator> {
    SyncOrchestrator::new(
        config.documents_root(),
        config.manifest_file(),
        build_embedder(config)?,
        build_index(config)?,
        SyncSettings::from_config(config),
    )
}

pub fn build_pipeline(config: &AppConfig) -> AppResult<AnsweringPipeline> {
    let retriever = Retriever::new(
        build_embedder(config)?,
        build_index(config)?,
        RetrieverSettings::from_config(config),
    );

    let llm = handbook_llm::create_client(&config.llm, config.timeouts.completion())?;
    let prompt = load_answer_prompt(Some(&config.workspace))?;
    let composer = AnswerComposer::new(llm, prompt, ComposerSettings::from_config(config));

    Ok(AnsweringPipeline::new(
        retriever,
        composer,
        RoleResolver::new(&config.answering.known_roles),
        &config.answering.core_values,
    ))
}

/// Pipeline behind a queue running at most `answering.workers` answers at once.
pub fn build_answer_queue(config: &AppConfig) -> AppResult<AnswerQueue> {
    let pipeline = Arc::new(build_pipeline(config)?);
    Ok(AnswerQueue::new(pipeline, config.answering.workers))
}
