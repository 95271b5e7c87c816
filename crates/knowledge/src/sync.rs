//! Incremental ingestion of the document tree into the vector index.
//!
//! A run scans the documents root, then processes each new or modified file
//! in order: load, chunk, embed, delete the file's old points, upsert the new
//! ones, and finally record the file in the manifest. The manifest entry is
//! the last step, so a failure anywhere earlier leaves the file eligible for
//! the next run.
//!
//! Runs must not overlap for the same documents root and manifest; callers
//! serialize them.

use crate::chunker::Chunker;
use crate::detector::{ChangeDetector, ScanOutcome};
use crate::embeddings::EmbeddingProvider;
use crate::loader::LoaderRegistry;
use crate::manifest::Manifest;
use crate::progress::ProgressReporter;
use crate::types::{Chunk, SourceFile};
use crate::vector_index::{IndexPoint, VectorIndex, FIELD_ROLE};
use handbook_core::{bounded_call, AppConfig, AppError, AppResult, ProviderKind, RetryPolicy};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tunables for a sync run.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_file_bytes: u64,

    /// Texts per embedding request and points per upsert request
    pub batch_size: usize,

    pub embed_timeout: Duration,
    pub index_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            max_file_bytes: 50 * 1024 * 1024,
            batch_size: 64,
            embed_timeout: Duration::from_secs(30),
            index_timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
        }
    }
}

impl SyncSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            chunk_size: config.chunking.size,
            chunk_overlap: config.chunking.overlap,
            max_file_bytes: config.chunking.max_file_bytes,
            batch_size: config.embedding.batch_size.max(1),
            embed_timeout: config.timeouts.embedding(),
            index_timeout: config.timeouts.index(),
            retry: config.timeouts.retry_policy(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Recreate the collection and re-index every eligible file
    pub force: bool,
}

/// Outcome of one sync run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Supported files found under the documents root
    pub files_scanned: usize,

    /// Files already indexed at their current modification time
    pub files_skipped: usize,

    /// Files whose path does not encode department and role
    pub files_rejected: usize,

    pub files_indexed: usize,

    /// Files that could not be read or indexed; retried on the next run
    pub files_failed: usize,

    pub chunks_created: usize,
    pub chunks_indexed: usize,
    pub duration_secs: f64,

    /// Sources counted in `files_failed`
    pub failed_sources: Vec<String>,
}

impl SyncReport {
    /// True when at least one file failed and will be retried.
    pub fn is_partial(&self) -> bool {
        self.files_failed > 0
    }
}

pub struct SyncOrchestrator {
    detector: ChangeDetector,
    loaders: LoaderRegistry,
    chunker: Chunker,
    manifest_path: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    settings: SyncSettings,
    progress: ProgressReporter,
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("root", &self.detector.root())
            .field("manifest", &self.manifest_path)
            .field("embedder", &self.embedder.provider_name())
            .field("index", &self.index.backend_name())
            .finish()
    }
}

impl SyncOrchestrator {
    pub fn new(
        documents_root: impl Into<PathBuf>,
        manifest_path: impl Into<PathBuf>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        settings: SyncSettings,
    ) -> AppResult<Self> {
        let loaders = LoaderRegistry::with_defaults(settings.max_file_bytes);
        let detector = ChangeDetector::new(documents_root, loaders.supported_extensions());
        let chunker = Chunker::new(settings.chunk_size, settings.chunk_overlap)?;

        Ok(Self {
            detector,
            loaders,
            chunker,
            manifest_path: manifest_path.into(),
            embedder,
            index,
            settings,
            progress: ProgressReporter::noop(),
        })
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn manifest(&self) -> AppResult<Manifest> {
        Manifest::load(&self.manifest_path)
    }

    /// Scan without indexing anything.
    pub fn plan(&self) -> AppResult<ScanOutcome> {
        let manifest = self.manifest()?;
        self.detector.scan(&manifest, false)
    }

    /// Execute one sync run.
    ///
    /// Fails only when the run cannot start (unreadable root, collection
    /// setup failure) or the manifest cannot be written. Per-file failures
    /// are counted in the report.
    pub async fn run(&self, options: SyncOptions) -> AppResult<SyncReport> {
        let started = Instant::now();
        tracing::info!(
            root = %self.detector.root().display(),
            force = options.force,
            embedder = self.embedder.provider_name(),
            index = self.index.backend_name(),
            "Starting sync"
        );

        let mut manifest = self.manifest()?;
        let outcome = self.detector.scan(&manifest, options.force)?;

        let mut report = SyncReport {
            files_scanned: outcome.scanned,
            files_skipped: outcome.unchanged,
            files_rejected: outcome.rejected,
            ..Default::default()
        };

        self.progress
            .scan(outcome.changed.len() as u64, outcome.scanned as u64);

        self.prepare_collection(options.force).await?;

        if options.force {
            // Entries must not outlive the points they describe.
            manifest = Manifest::empty(&self.manifest_path);
            manifest.save()?;
        }

        let total = outcome.changed.len() as u64;
        for (i, file) in outcome.changed.iter().enumerate() {
            let current = i as u64 + 1;
            match self.sync_file(file, current, total, &mut report).await {
                Ok(indexed) => {
                    manifest.record(&file.source, file.last_modified);
                    manifest.save()?;
                    report.files_indexed += 1;
                    report.chunks_indexed += indexed;
                    self.progress.commit(current, total, &file.source);
                }
                Err(e) if e.is_item_level() => {
                    tracing::warn!(source = %file.source, error = %e, "Skipping unreadable source");
                    report.files_failed += 1;
                    report.failed_sources.push(file.source.clone());
                }
                Err(e) => {
                    tracing::error!(
                        source = %file.source,
                        error = %e,
                        "Failed to index source, it will be retried on the next run"
                    );
                    report.files_failed += 1;
                    report.failed_sources.push(file.source.clone());
                }
            }
        }

        report.duration_secs = started.elapsed().as_secs_f64();

        tracing::info!(
            files = report.files_indexed,
            failed = report.files_failed,
            skipped = report.files_skipped,
            rejected = report.files_rejected,
            chunks = report.chunks_indexed,
            duration_secs = report.duration_secs,
            "Sync finished"
        );

        Ok(report)
    }

    async fn prepare_collection(&self, force: bool) -> AppResult<()> {
        let dimensions = self.embedder.dimensions();
        let index = &self.index;

        if force {
            bounded_call(
                "recreate collection",
                self.settings.index_timeout,
                self.settings.retry,
                || index.recreate_collection(dimensions),
            )
            .await?;
        } else {
            bounded_call(
                "ensure collection",
                self.settings.index_timeout,
                self.settings.retry,
                || index.ensure_collection(dimensions),
            )
            .await?;
        }

        let field_index = bounded_call(
            "create field index",
            self.settings.index_timeout,
            RetryPolicy::none(),
            || index.create_field_index(FIELD_ROLE),
        )
        .await;
        if let Err(e) = field_index {
            tracing::warn!(error = %e, field = FIELD_ROLE, "Could not create payload index");
        }

        Ok(())
    }

    /// Load, chunk, embed and index one file. Returns the number of points written.
    #[tracing::instrument(skip(self, report), fields(source = %file.source))]
    async fn sync_file(
        &self,
        file: &SourceFile,
        current: u64,
        total: u64,
        report: &mut SyncReport,
    ) -> AppResult<usize> {
        self.progress.load(current, total, &file.source);
        let documents = self.loaders.load(file).await?;

        let chunks = self.chunker.chunk(&documents);
        report.chunks_created += chunks.len();
        self.progress.chunk(current, total, chunks.len());

        let vectors = self.embed_chunks(&chunks).await?;

        let index = &self.index;
        let source = file.source.as_str();
        bounded_call(
            "delete points",
            self.settings.index_timeout,
            self.settings.retry,
            || index.delete_by_source(source),
        )
        .await?;

        let points: Vec<IndexPoint> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexPoint::new(chunk, vector))
            .collect();

        let mut written = 0usize;
        for batch in points.chunks(self.settings.batch_size.max(1)) {
            bounded_call(
                "upsert points",
                self.settings.index_timeout,
                self.settings.retry,
                || index.upsert(batch),
            )
            .await?;
            written += batch.len();
            self.progress
                .upsert(written as u64, points.len() as u64, index.backend_name());
        }

        tracing::debug!(chunks = written, "Indexed source");
        Ok(written)
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> AppResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(chunks.len());
        let embedder = &self.embedder;

        for batch in chunks.chunks(self.settings.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text().to_string()).collect();
            let texts = texts.as_slice();

            let embedded = bounded_call(
                "embed chunks",
                self.settings.embed_timeout,
                self.settings.retry,
                || embedder.embed_batch(texts),
            )
            .await?;

            if embedded.len() != batch.len() {
                return Err(AppError::permanent(
                    ProviderKind::Embedding,
                    format!(
                        "Expected {} embeddings, provider returned {}",
                        batch.len(),
                        embedded.len()
                    ),
                ));
            }

            vectors.extend(embedded);
            self.progress.embed(
                vectors.len() as u64,
                chunks.len() as u64,
                embedder.model_name(),
            );
        }

        Ok(vectors)
    }
}
