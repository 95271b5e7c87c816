use super::{source_read, DocumentLoader};
use async_trait::async_trait;
use handbook_core::AppResult;
use std::path::Path;

/// PDF text extraction. Runs on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLoader;

#[async_trait]
impl DocumentLoader for PdfLoader {
    fn supported_extensions(&self) -> &[&'static str] {
        &["pdf"]
    }

    async fn extract(&self, path: &Path) -> AppResult<String> {
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || pdf_extract::extract_text(&owned))
            .await
            .map_err(|e| source_read(path, format!("PDF extraction task failed: {}", e)))?
            .map_err(|e| source_read(path, format!("PDF extraction failed: {}", e)))
    }
}
