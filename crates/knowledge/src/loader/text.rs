use super::{source_read, DocumentLoader};
use async_trait::async_trait;
use handbook_core::AppResult;
use std::path::Path;

/// Plain text and Markdown files, read as UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLoader;

#[async_trait]
impl DocumentLoader for TextLoader {
    fn supported_extensions(&self) -> &[&'static str] {
        &["txt", "md", "markdown"]
    }

    async fn extract(&self, path: &Path) -> AppResult<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| source_read(path, e))?;
        String::from_utf8(bytes).map_err(|_| source_read(path, "file is not valid UTF-8"))
    }
}
