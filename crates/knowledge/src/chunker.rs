//! Splitting documents into overlapping chunks.

use crate::types::{Chunk, Document};
use handbook_core::{AppError, AppResult};
use text_splitter::{ChunkConfig, TextSplitter};

/// Character-budget splitter with overlap.
///
/// Splits prefer paragraph, then sentence, then word boundaries. Positions
/// are assigned sequentially across all documents of one source file.
pub struct Chunker {
    splitter: TextSplitter<text_splitter::Characters>,
    size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(size: usize, overlap: usize) -> AppResult<Self> {
        if size == 0 {
            return Err(AppError::Config("Chunk size must be greater than zero".to_string()));
        }
        if overlap >= size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, size
            )));
        }

        let config = ChunkConfig::new(size)
            .with_overlap(overlap)
            .map_err(|e| AppError::Config(format!("Invalid chunking settings: {}", e)))?;

        Ok(Self {
            splitter: TextSplitter::new(config),
            size,
            overlap,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk every document of one source file, in order.
    pub fn chunk(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut position = 0u32;

        for document in documents {
            for piece in self.splitter.chunks(&document.text) {
                if piece.trim().is_empty() {
                    continue;
                }
                chunks.push(Chunk::new(piece, position, document.metadata.clone()));
                position += 1;
            }
        }

        tracing::debug!(
            documents = documents.len(),
            chunks = chunks.len(),
            size = self.size,
            overlap = self.overlap,
            "Chunked source"
        );

        chunks
    }
}

impl std::fmt::Debug for Chunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunker")
            .field("size", &self.size)
            .field("overlap", &self.overlap)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;

    fn document(text: &str) -> Document {
        Document {
            text: text.to_string(),
            metadata: ChunkMetadata::new("sales", "general", "sales/general/playbook.pdf"),
        }
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(matches!(Chunker::new(100, 100), Err(AppError::Config(_))));
        assert!(matches!(Chunker::new(0, 0), Err(AppError::Config(_))));
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunker = Chunker::new(1000, 200).unwrap();
        let chunks = chunker.chunk(&[document("Discounts above 20% need approval.")]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].position(), 0);
        assert_eq!(chunks[0].source(), "sales/general/playbook.pdf");
        assert_eq!(chunks[0].role(), "general");
    }

    #[test]
    fn test_chunks_respect_size_and_keep_order() {
        let chunker = Chunker::new(100, 20).unwrap();
        let text = (0..40)
            .map(|i| format!("Sentence number {} of the handbook.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunker.chunk(&[document(&text)]);

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.position() as usize, i);
            assert!(chunk.text().chars().count() <= 100);
        }
        assert!(chunks[0].text().starts_with("Sentence number 0"));
    }

    #[test]
    fn test_positions_continue_across_documents() {
        let chunker = Chunker::new(1000, 200).unwrap();
        let chunks = chunker.chunk(&[document("Page one."), document("Page two.")]);
        let positions: Vec<u32> = chunks.iter().map(|c| c.position()).collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[test]
    fn test_blank_text_has_no_chunks() {
        let chunker = Chunker::new(1000, 200).unwrap();
        assert!(chunker.chunk(&[document("   \n\n  ")]).is_empty());
    }
}
