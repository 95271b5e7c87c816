//! Vector index abstraction for knowledge chunks.
//!
//! A collection holds one point per chunk. The point payload carries the chunk
//! text and its `department`, `role`, `source` and `position`. Point ids are
//! derived from `(source, position)`, so re-indexing a file overwrites its
//! points instead of duplicating them.

mod memory;
mod qdrant;

pub use memory::MemoryIndex;
pub use qdrant::QdrantIndex;

use crate::types::{Chunk, ChunkMetadata, GENERAL_ROLE};
use async_trait::async_trait;
use handbook_core::{AppError, AppResult, ProviderKind};
use uuid::Uuid;

pub const FIELD_TEXT: &str = "text";
pub const FIELD_DEPARTMENT: &str = "department";
pub const FIELD_ROLE: &str = "role";
pub const FIELD_SOURCE: &str = "source";
pub const FIELD_POSITION: &str = "position";

/// Stable point id for the chunk at `position` of `source`.
pub fn point_id(source: &str, position: u32) -> String {
    Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("{}#{}", source, position).as_bytes(),
    )
    .to_string()
}

/// A chunk and its embedding, ready to upsert.
#[derive(Debug, Clone)]
pub struct IndexPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

impl IndexPoint {
    pub fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: point_id(chunk.source(), chunk.position()),
            vector,
            chunk,
        }
    }
}

/// A search hit with its similarity score (higher is closer).
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Disjunctive role filter: `role == requester OR role == "general"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleFilter {
    roles: Vec<String>,
}

impl RoleFilter {
    /// Collapses to a single condition when the requester is `general`.
    pub fn for_requester(role: &str) -> Self {
        let mut roles = vec![role.to_string()];
        if role != GENERAL_ROLE {
            roles.push(GENERAL_ROLE.to_string());
        }
        Self { roles }
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn matches(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Storage backend for chunk vectors.
///
/// Every method operates on the collection the index was built for.
#[async_trait]
pub trait VectorIndex: Send + Sync + std::fmt::Debug {
    fn backend_name(&self) -> &str;

    fn collection(&self) -> &str;

    async fn collection_exists(&self) -> AppResult<bool>;

    /// Create the collection with `dimensions`-sized cosine vectors if missing.
    async fn ensure_collection(&self, dimensions: usize) -> AppResult<()>;

    /// Drop the collection (if present) and create it empty.
    async fn recreate_collection(&self, dimensions: usize) -> AppResult<()>;

    /// Request a keyword index on a payload field.
    async fn create_field_index(&self, field: &str) -> AppResult<()>;

    async fn upsert(&self, points: &[IndexPoint]) -> AppResult<()>;

    /// Remove every point whose `source` payload equals `source`.
    async fn delete_by_source(&self, source: &str) -> AppResult<()>;

    /// Top-`limit` points by cosine similarity among those passing `filter`.
    /// A collection that does not exist yet has no points.
    async fn search(
        &self,
        vector: &[f32],
        filter: &RoleFilter,
        limit: usize,
    ) -> AppResult<Vec<ScoredChunk>>;

    /// Number of points; zero when the collection does not exist.
    async fn count(&self) -> AppResult<u64>;
}

/// JSON payload stored with each point.
pub(crate) fn chunk_payload(chunk: &Chunk) -> serde_json::Value {
    let meta = chunk.metadata();
    serde_json::json!({
        FIELD_TEXT: chunk.text(),
        FIELD_DEPARTMENT: meta.department(),
        FIELD_ROLE: meta.role(),
        FIELD_SOURCE: meta.source(),
        FIELD_POSITION: chunk.position(),
    })
}

/// Rebuild a chunk from payload fields, rejecting incomplete payloads.
pub(crate) fn chunk_from_fields(
    text: Option<String>,
    department: Option<String>,
    role: Option<String>,
    source: Option<String>,
    position: Option<i64>,
) -> AppResult<Chunk> {
    let missing = |field: &str| {
        AppError::permanent(
            ProviderKind::Index,
            format!("Point payload is missing '{}'", field),
        )
    };

    let position = position.ok_or_else(|| missing(FIELD_POSITION))?;
    let position = u32::try_from(position).map_err(|_| missing(FIELD_POSITION))?;

    Ok(Chunk::new(
        text.ok_or_else(|| missing(FIELD_TEXT))?,
        position,
        ChunkMetadata::new(
            department.ok_or_else(|| missing(FIELD_DEPARTMENT))?,
            role.ok_or_else(|| missing(FIELD_ROLE))?,
            source.ok_or_else(|| missing(FIELD_SOURCE))?,
        ),
    ))
}
