//! In-process vector index with exact search.

use crate::distance::distance;
use crate::types::{IndexEntry, QueryHit};
use crate::vector_index::{rank_hits, validate_entries, validate_query, VectorIndex};
use medrag_core::{AppError, AppResult, DistanceMetric};
use tokio::sync::RwLock;

/// Vector index kept in memory; nothing survives the process.
pub struct InMemoryIndex {
    collection: String,
    metric: DistanceMetric,
    dimensions: usize,
    entries: RwLock<Vec<IndexEntry>>,
}

impl InMemoryIndex {
    pub fn new(collection: impl Into<String>, dimensions: usize, metric: DistanceMetric) -> Self {
        Self {
            collection: collection.into(),
            metric,
            dimensions,
            entries: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl VectorIndex for InMemoryIndex {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(self.entries.read().await.len())
    }

    async fn add(&self, entries: Vec<IndexEntry>) -> AppResult<usize> {
        validate_entries(&entries, self.dimensions)?;

        let mut stored = self.entries.write().await;
        if let Some(existing) = entries
            .iter()
            .find(|e| stored.iter().any(|s| s.id == e.id))
        {
            return Err(AppError::DuplicateId(format!(
                "'{}' already exists in collection '{}'",
                existing.id, self.collection
            )));
        }

        let added = entries.len();
        stored.extend(entries);
        Ok(added)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> AppResult<Vec<QueryHit>> {
        validate_query(vector, top_k, self.dimensions)?;

        let stored = self.entries.read().await;
        let hits = stored
            .iter()
            .map(|entry| QueryHit {
                id: entry.id.clone(),
                text: entry.text.clone(),
                metadata: entry.metadata.clone(),
                distance: distance(self.metric, vector, &entry.vector),
            })
            .collect();

        Ok(rank_hits(hits, top_k))
    }

    async fn delete(&self, ids: &[String]) -> AppResult<usize> {
        let mut stored = self.entries.write().await;
        let before = stored.len();
        stored.retain(|entry| !ids.contains(&entry.id));
        Ok(before - stored.len())
    }

    async fn clear(&self) -> AppResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}
