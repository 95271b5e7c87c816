//! Qdrant-backed vector index (gRPC).

use super::{
    chunk_from_fields, chunk_payload, IndexPoint, RoleFilter, ScoredChunk, VectorIndex,
    FIELD_DEPARTMENT, FIELD_POSITION, FIELD_ROLE, FIELD_SOURCE, FIELD_TEXT,
};
use async_trait::async_trait;
use handbook_core::{AppError, AppResult, ProviderKind};
use qdrant_client::qdrant::{
    value::Kind, Condition, CountPointsBuilder, CreateCollectionBuilder,
    CreateFieldIndexCollectionBuilder, DeletePointsBuilder, Distance, FieldType, Filter,
    PointStruct, ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder, Value,
    VectorParamsBuilder,
};
use qdrant_client::{Qdrant, QdrantError};
use std::collections::HashMap;
use std::time::Duration;

pub struct QdrantIndex {
    client: Qdrant,
    url: String,
    collection: String,
}

impl std::fmt::Debug for QdrantIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantIndex")
            .field("url", &self.url)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

fn index_error(operation: &str, err: QdrantError) -> AppError {
    AppError::transient(
        ProviderKind::Index,
        format!("Qdrant {} failed: {}", operation, err),
    )
}

impl QdrantIndex {
    /// Connect lazily; no request is made until the first operation.
    pub fn connect(
        url: &str,
        api_key: Option<String>,
        collection: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = Qdrant::from_url(url)
            .api_key(api_key)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Invalid Qdrant settings for {}: {}", url, e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
            collection: collection.into(),
        })
    }

    async fn create(&self, dimensions: usize) -> AppResult<()> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(|e| index_error("create collection", e))?;
        tracing::info!(collection = %self.collection, dimensions, "Created Qdrant collection");
        Ok(())
    }

    fn to_point(point: &IndexPoint) -> AppResult<PointStruct> {
        let payload: HashMap<String, Value> = serde_json::from_value(chunk_payload(&point.chunk))?;
        Ok(PointStruct::new(point.id.clone(), point.vector.clone(), payload))
    }

    fn to_scored_chunk(point: ScoredPoint) -> AppResult<ScoredChunk> {
        let text = |field: &str| match point.payload.get(field).and_then(|v| v.kind.as_ref()) {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        };
        let position = match point.payload.get(FIELD_POSITION).and_then(|v| v.kind.as_ref()) {
            Some(Kind::IntegerValue(n)) => Some(*n),
            Some(Kind::DoubleValue(n)) => Some(*n as i64),
            _ => None,
        };

        let chunk = chunk_from_fields(
            text(FIELD_TEXT),
            text(FIELD_DEPARTMENT),
            text(FIELD_ROLE),
            text(FIELD_SOURCE),
            position,
        )?;

        Ok(ScoredChunk {
            chunk,
            score: point.score,
        })
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    fn backend_name(&self) -> &str {
        "qdrant"
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    async fn collection_exists(&self) -> AppResult<bool> {
        self.client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| index_error("collection check", e))
    }

    async fn ensure_collection(&self, dimensions: usize) -> AppResult<()> {
        if self.collection_exists().await? {
            return Ok(());
        }
        self.create(dimensions).await
    }

    async fn recreate_collection(&self, dimensions: usize) -> AppResult<()> {
        if self.collection_exists().await? {
            self.client
                .delete_collection(&self.collection)
                .await
                .map_err(|e| index_error("delete collection", e))?;
            tracing::info!(collection = %self.collection, "Deleted Qdrant collection");
        }
        self.create(dimensions).await
    }

    async fn create_field_index(&self, field: &str) -> AppResult<()> {
        self.client
            .create_field_index(CreateFieldIndexCollectionBuilder::new(
                &self.collection,
                field,
                FieldType::Keyword,
            ))
            .await
            .map_err(|e| index_error("create field index", e))?;
        Ok(())
    }

    async fn upsert(&self, points: &[IndexPoint]) -> AppResult<()> {
        if points.is_empty() {
            return Ok(());
        }

        let structs = points
            .iter()
            .map(Self::to_point)
            .collect::<AppResult<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, structs).wait(true))
            .await
            .map_err(|e| index_error("upsert", e))?;
        Ok(())
    }

    async fn delete_by_source(&self, source: &str) -> AppResult<()> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(Filter::must([Condition::matches(
                        FIELD_SOURCE,
                        source.to_string(),
                    )]))
                    .wait(true),
            )
            .await
            .map_err(|e| index_error("delete", e))?;
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        filter: &RoleFilter,
        limit: usize,
    ) -> AppResult<Vec<ScoredChunk>> {
        let conditions: Vec<Condition> = filter
            .roles()
            .iter()
            .map(|role| Condition::matches(FIELD_ROLE, role.clone()))
            .collect();

        let result = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector.to_vec(), limit as u64)
                    .filter(Filter::should(conditions))
                    .with_payload(true),
            )
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                if !self.collection_exists().await? {
                    tracing::debug!(collection = %self.collection, "Searching a collection that does not exist yet");
                    return Ok(Vec::new());
                }
                return Err(index_error("search", e));
            }
        };

        response
            .result
            .into_iter()
            .map(Self::to_scored_chunk)
            .collect()
    }

    async fn count(&self) -> AppResult<u64> {
        if !self.collection_exists().await? {
            return Ok(0);
        }

        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(|e| index_error("count", e))?;
        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }
}
