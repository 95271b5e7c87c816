//! Knowledge system type definitions.

use serde::Serialize;
use std::path::PathBuf;

/// Role value whose documents are visible to every requester.
pub const GENERAL_ROLE: &str = "general";

/// A supported document discovered under the documents root.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// Absolute path on disk
    pub path: PathBuf,

    /// Stable key: path relative to the documents root, `/`-separated
    pub source: String,

    /// First path component below the root
    pub department: String,

    /// Second path component below the root
    pub role: String,

    /// Modification time in seconds since the Unix epoch
    pub last_modified: f64,
}

/// Metadata attached to every chunk of a source file.
///
/// Fields are private: metadata is derived from the file path once and never
/// edited afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkMetadata {
    department: String,
    role: String,
    source: String,
}

impl ChunkMetadata {
    pub(crate) fn new(
        department: impl Into<String>,
        role: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            department: department.into(),
            role: role.into(),
            source: source.into(),
        }
    }

    pub(crate) fn for_file(file: &SourceFile) -> Self {
        Self::new(&file.department, &file.role, &file.source)
    }

    pub fn department(&self) -> &str {
        &self.department
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Extracted text of one source file, ready for chunking.
#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A contiguous span of a document's text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    text: String,
    position: u32,
    metadata: ChunkMetadata,
}

impl Chunk {
    pub(crate) fn new(text: impl Into<String>, position: u32, metadata: ChunkMetadata) -> Self {
        Self {
            text: text.into(),
            position,
            metadata,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Zero-based index of the chunk within its source
    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn metadata(&self) -> &ChunkMetadata {
        &self.metadata
    }

    pub fn source(&self) -> &str {
        self.metadata.source()
    }

    pub fn role(&self) -> &str {
        self.metadata.role()
    }
}

/// A chunk returned by the retriever, with its similarity score and 1-based rank.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f32,
    pub rank: usize,
}

/// Answer text plus the distinct sources it was grounded on, in rank order.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerResult {
    pub text: String,
    pub cited_sources: Vec<String>,
}

impl AnswerResult {
    pub fn new(text: impl Into<String>, cited_sources: Vec<String>) -> Self {
        Self {
            text: text.into(),
            cited_sources,
        }
    }
}
