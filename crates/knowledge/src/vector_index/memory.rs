//! In-process vector index with optional JSON snapshot persistence.

use super::{chunk_from_fields, IndexPoint, RoleFilter, ScoredChunk, VectorIndex};
use crate::types::Chunk;
use async_trait::async_trait;
use handbook_core::{AppError, AppResult, ProviderKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPoint {
    vector: Vec<f32>,
    text: String,
    department: String,
    role: String,
    source: String,
    position: u32,
}

impl StoredPoint {
    fn from_point(point: &IndexPoint) -> Self {
        let meta = point.chunk.metadata();
        Self {
            vector: point.vector.clone(),
            text: point.chunk.text().to_string(),
            department: meta.department().to_string(),
            role: meta.role().to_string(),
            source: meta.source().to_string(),
            position: point.chunk.position(),
        }
    }

    fn to_chunk(&self) -> AppResult<Chunk> {
        chunk_from_fields(
            Some(self.text.clone()),
            Some(self.department.clone()),
            Some(self.role.clone()),
            Some(self.source.clone()),
            Some(i64::from(self.position)),
        )
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Collection {
    dimensions: usize,
    points: BTreeMap<String, StoredPoint>,
}

/// Vector index kept in memory, searched by brute-force cosine similarity.
///
/// With a snapshot path the collection is loaded at construction and
/// rewritten after every write, so local runs survive restarts.
#[derive(Debug)]
pub struct MemoryIndex {
    name: String,
    collection: RwLock<Option<Collection>>,
    snapshot: Option<PathBuf>,
    writes: AtomicU64,
}

impl MemoryIndex {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            name: collection.into(),
            collection: RwLock::new(None),
            snapshot: None,
            writes: AtomicU64::new(0),
        }
    }

    /// Back the index with a JSON file, loading it if it exists.
    pub fn with_snapshot(collection: impl Into<String>, path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let loaded = match std::fs::read_to_string(&path) {
            Ok(contents) => Some(serde_json::from_str::<Collection>(&contents).map_err(|e| {
                AppError::Serialization(format!(
                    "Invalid index snapshot {}: {}",
                    path.display(),
                    e
                ))
            })?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            name: collection.into(),
            collection: RwLock::new(loaded),
            snapshot: Some(path),
            writes: AtomicU64::new(0),
        })
    }

    /// Number of upsert and delete calls made so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn persist(&self, collection: &Option<Collection>) -> AppResult<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        write_snapshot(path, collection)
    }

    fn check_dimensions(collection: &Collection, vector: &[f32]) -> AppResult<()> {
        if vector.len() != collection.dimensions {
            return Err(AppError::permanent(
                ProviderKind::Index,
                format!(
                    "Vector has {} dimensions, collection expects {}",
                    vector.len(),
                    collection.dimensions
                ),
            ));
        }
        Ok(())
    }

    fn missing(&self) -> AppError {
        AppError::permanent(
            ProviderKind::Index,
            format!("Collection '{}' does not exist", self.name),
        )
    }
}

fn write_snapshot(path: &Path, collection: &Option<Collection>) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    match collection {
        Some(collection) => {
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, serde_json::to_vec(collection)?)?;
            std::fs::rename(&tmp, path)?;
        }
        None => {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
    }
    Ok(())
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn backend_name(&self) -> &str {
        "memory"
    }

    fn collection(&self) -> &str {
        &self.name
    }

    async fn collection_exists(&self) -> AppResult<bool> {
        Ok(self.collection.read().await.is_some())
    }

    async fn ensure_collection(&self, dimensions: usize) -> AppResult<()> {
        let mut guard = self.collection.write().await;
        if guard.is_none() {
            *guard = Some(Collection {
                dimensions,
                points: BTreeMap::new(),
            });
            self.persist(&guard)?;
        }
        Ok(())
    }

    async fn recreate_collection(&self, dimensions: usize) -> AppResult<()> {
        let mut guard = self.collection.write().await;
        *guard = Some(Collection {
            dimensions,
            points: BTreeMap::new(),
        });
        self.persist(&guard)
    }

    async fn create_field_index(&self, field: &str) -> AppResult<()> {
        tracing::debug!(field, "Field indexes are implicit for the memory backend");
        Ok(())
    }

    async fn upsert(&self, points: &[IndexPoint]) -> AppResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.collection.write().await;
        let collection = guard.as_mut().ok_or_else(|| self.missing())?;

        for point in points {
            Self::check_dimensions(collection, &point.vector)?;
        }
        for point in points {
            collection
                .points
                .insert(point.id.clone(), StoredPoint::from_point(point));
        }
        self.persist(&guard)
    }

    async fn delete_by_source(&self, source: &str) -> AppResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.collection.write().await;
        let collection = guard.as_mut().ok_or_else(|| self.missing())?;
        collection.points.retain(|_, p| p.source != source);
        self.persist(&guard)
    }

    async fn search(
        &self,
        vector: &[f32],
        filter: &RoleFilter,
        limit: usize,
    ) -> AppResult<Vec<ScoredChunk>> {
        let guard = self.collection.read().await;
        let Some(collection) = guard.as_ref() else {
            tracing::debug!(collection = %self.name, "Searching a collection that does not exist yet");
            return Ok(Vec::new());
        };
        Self::check_dimensions(collection, vector)?;

        let mut hits: Vec<(f32, &StoredPoint)> = collection
            .points
            .values()
            .filter(|p| filter.matches(&p.role))
            .map(|p| (cosine(vector, &p.vector), p))
            .collect();

        hits.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| a.1.source.cmp(&b.1.source))
                .then_with(|| a.1.position.cmp(&b.1.position))
        });

        hits.into_iter()
            .take(limit)
            .map(|(score, p)| {
                Ok(ScoredChunk {
                    chunk: p.to_chunk()?,
                    score,
                })
            })
            .collect()
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self
            .collection
            .read()
            .await
            .as_ref()
            .map(|c| c.points.len() as u64)
            .unwrap_or(0))
    }
}
