//! Text extraction from source documents.
//!
//! Each loader handles a fixed set of extensions. The registry picks one by
//! extension and enforces the file size limit. Every failure is reported as
//! `AppError::SourceRead` so that callers can skip the file and continue.

mod docx;
mod pdf;
mod text;

pub use docx::DocxLoader;
pub use pdf::PdfLoader;
pub use text::TextLoader;

use crate::types::{ChunkMetadata, Document, SourceFile};
use async_trait::async_trait;
use handbook_core::{AppError, AppResult};
use std::path::Path;
use std::sync::Arc;

/// Extracts plain text from one kind of document.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Lowercase extensions without the leading dot
    fn supported_extensions(&self) -> &[&'static str];

    /// Extract the text of `path`. Blank output is allowed.
    async fn extract(&self, path: &Path) -> AppResult<String>;

    /// Load `file` into documents carrying its metadata.
    async fn load(&self, file: &SourceFile) -> AppResult<Vec<Document>> {
        let text = self.extract(&file.path).await?;
        Ok(vec![Document {
            text,
            metadata: ChunkMetadata::for_file(file),
        }])
    }
}

pub(crate) fn source_read(path: &Path, reason: impl std::fmt::Display) -> AppError {
    AppError::SourceRead {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Selects a loader by file extension.
#[derive(Clone)]
pub struct LoaderRegistry {
    loaders: Vec<Arc<dyn DocumentLoader>>,
    max_file_bytes: u64,
}

impl LoaderRegistry {
    /// Registry with no loaders; every file is unsupported until one is registered.
    pub fn new(max_file_bytes: u64) -> Self {
        Self {
            loaders: Vec::new(),
            max_file_bytes,
        }
    }

    /// Registry with the PDF, DOCX and plain-text loaders.
    pub fn with_defaults(max_file_bytes: u64) -> Self {
        Self::new(max_file_bytes)
            .register(Arc::new(PdfLoader))
            .register(Arc::new(DocxLoader))
            .register(Arc::new(TextLoader))
    }

    /// Add a loader. Earlier loaders win when extensions overlap.
    pub fn register(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Every extension some loader accepts.
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut extensions: Vec<&'static str> = self
            .loaders
            .iter()
            .flat_map(|l| l.supported_extensions().iter().copied())
            .collect();
        extensions.sort_unstable();
        extensions.dedup();
        extensions
    }

    fn loader_for(&self, path: &Path) -> Option<&Arc<dyn DocumentLoader>> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        self.loaders
            .iter()
            .find(|l| l.supported_extensions().contains(&ext.as_str()))
    }

    /// Load `file`, rejecting unsupported or oversized files.
    pub async fn load(&self, file: &SourceFile) -> AppResult<Vec<Document>> {
        let loader = self
            .loader_for(&file.path)
            .ok_or_else(|| source_read(&file.path, "unsupported file type"))?;

        let size = tokio::fs::metadata(&file.path)
            .await
            .map_err(|e| source_read(&file.path, e))?
            .len();
        if size > self.max_file_bytes {
            return Err(source_read(
                &file.path,
                format!(
                    "file is {} bytes, limit is {} bytes",
                    size, self.max_file_bytes
                ),
            ));
        }

        let documents = loader.load(file).await?;
        tracing::debug!(
            source = %file.source,
            documents = documents.len(),
            bytes = size,
            "Loaded source"
        );
        Ok(documents)
    }
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("extensions", &self.supported_extensions())
            .field("max_file_bytes", &self.max_file_bytes)
            .finish()
    }
}
