//! Shared fixtures.

use crate::embeddings::{EmbeddingProvider, TrigramEmbedder};
use crate::rag::{AnswerComposer, AnsweringPipeline, ComposerSettings};
use crate::retriever::{Retriever, RetrieverSettings};
use crate::roles::RoleResolver;
use crate::sync::{SyncOrchestrator, SyncSettings};
use crate::vector_index::{IndexPoint, MemoryIndex, RoleFilter, ScoredChunk, VectorIndex};
use async_trait::async_trait;
use handbook_core::{AppError, AppResult, ProviderKind, RetryPolicy};
use handbook_llm::MockLlmClient;
use handbook_prompt::load_answer_prompt;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

pub const DIMENSIONS: usize = 128;

/// Trigram embedder that counts its calls.
#[derive(Debug)]
pub struct CountingEmbedder {
    inner: TrigramEmbedder,
    calls: AtomicUsize,
    texts: AtomicUsize,
}

impl CountingEmbedder {
    pub fn new() -> Self {
        Self {
            inner: TrigramEmbedder::new(DIMENSIONS),
            calls: AtomicUsize::new(0),
            texts: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn texts(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    fn provider_name(&self) -> &str {
        "counting"
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed_batch(texts).await
    }
}

/// Memory index whose upserts can be switched to fail.
#[derive(Debug)]
pub struct FlakyIndex {
    inner: MemoryIndex,
    fail_upserts: AtomicBool,
}

impl FlakyIndex {
    pub fn new() -> Self {
        Self {
            inner: MemoryIndex::new("handbook"),
            fail_upserts: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_upserts.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl VectorIndex for FlakyIndex {
    fn backend_name(&self) -> &str {
        "flaky"
    }

    fn collection(&self) -> &str {
        self.inner.collection()
    }

    async fn collection_exists(&self) -> AppResult<bool> {
        self.inner.collection_exists().await
    }

    async fn ensure_collection(&self, dimensions: usize) -> AppResult<()> {
        self.inner.ensure_collection(dimensions).await
    }

    async fn recreate_collection(&self, dimensions: usize) -> AppResult<()> {
        self.inner.recreate_collection(dimensions).await
    }

    async fn create_field_index(&self, field: &str) -> AppResult<()> {
        self.inner.create_field_index(field).await
    }

    async fn upsert(&self, points: &[IndexPoint]) -> AppResult<()> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(AppError::permanent(ProviderKind::Index, "index unavailable"));
        }
        self.inner.upsert(points).await
    }

    async fn delete_by_source(&self, source: &str) -> AppResult<()> {
        self.inner.delete_by_source(source).await
    }

    async fn search(
        &self,
        vector: &[f32],
        filter: &RoleFilter,
        limit: usize,
    ) -> AppResult<Vec<ScoredChunk>> {
        self.inner.search(vector, filter, limit).await
    }

    async fn count(&self) -> AppResult<u64> {
        self.inner.count().await
    }
}

/// A temporary workspace with a `documents/` tree and a manifest path.
pub struct Fixture {
    _temp: TempDir,
    pub documents: PathBuf,
    pub manifest: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let documents = temp.path().join("documents");
        fs::create_dir_all(&documents).unwrap();
        let manifest = temp.path().join("data/processed_files.json");
        Self {
            _temp: temp,
            documents,
            manifest,
        }
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.documents.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    /// Write a minimal Word document with one paragraph per entry.
    pub fn write_docx(&self, rel: &str, paragraphs: &[&str]) -> PathBuf {
        let path = self.documents.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();

        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
            .collect();
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );

        let mut zip = zip::ZipWriter::new(fs::File::create(&path).unwrap());
        zip.start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
        path
    }

    /// Move a file's modification time `secs` seconds into the future.
    pub fn touch(&self, rel: &str, secs: u64) {
        let file = fs::OpenOptions::new()
            .write(true)
            .open(self.documents.join(rel))
            .unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(secs))
            .unwrap();
    }

    pub fn orchestrator(
        &self,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> SyncOrchestrator {
        SyncOrchestrator::new(
            &self.documents,
            &self.manifest,
            embedder,
            index,
            SyncSettings {
                retry: RetryPolicy::none(),
                ..Default::default()
            },
        )
        .unwrap()
    }
}

pub fn retriever(
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
) -> Retriever {
    Retriever::new(
        embedder,
        index,
        RetrieverSettings {
            top_k,
            retry: RetryPolicy::none(),
            ..Default::default()
        },
    )
}

pub fn pipeline(
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    llm: MockLlmClient,
    core_values: &str,
) -> AnsweringPipeline {
    let composer = AnswerComposer::new(
        Arc::new(llm),
        load_answer_prompt(None).unwrap(),
        ComposerSettings {
            retry: RetryPolicy::none(),
            ..Default::default()
        },
    );
    AnsweringPipeline::new(
        retriever(embedder, index, 4),
        composer,
        RoleResolver::default(),
        core_values,
    )
}
