//! LanceDB-backed vector index implementation.
//!
//! One LanceDB database per store directory, one table per collection.
//! Next to each table a `<collection>.manifest.json` records the metric,
//! dimensionality and encoder model the collection was created with.

use crate::distance::distance;
use crate::types::{EntryMetadata, IndexEntry, QueryHit};
use crate::vector_index::{rank_hits, validate_entries, validate_query, VectorIndex};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{DistanceType, Table};
use medrag_core::{AppError, AppResult, DistanceMetric};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const VECTOR_COLUMN: &str = "vector";

/// Collection parameters persisted beside the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexManifest {
    pub collection: String,
    pub metric: DistanceMetric,
    pub dimensions: usize,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

impl IndexManifest {
    fn path(db_path: &Path, collection: &str) -> PathBuf {
        db_path.join(format!("{}.manifest.json", collection))
    }

    /// Read the manifest for a collection, if one exists.
    pub fn read(db_path: &Path, collection: &str) -> AppResult<Option<Self>> {
        let path = Self::path(db_path, collection);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        let manifest = serde_json::from_str(&contents).map_err(|e| {
            AppError::Knowledge(format!("Corrupt index manifest {:?}: {}", path, e))
        })?;
        Ok(Some(manifest))
    }

    fn write(&self, db_path: &Path) -> AppResult<()> {
        let path = Self::path(db_path, &self.collection);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// LanceDB-backed vector index.
pub struct LanceDbIndex {
    table: Table,
    manifest: IndexManifest,
}

impl LanceDbIndex {
    /// Open a collection, creating the store and table if absent.
    ///
    /// Reopening an existing collection with a different metric or
    /// dimensionality is an error.
    ///
    /// # Arguments
    /// * `db_path` - Store directory
    /// * `collection` - Table name inside the store
    /// * `dimensions` - Vector dimensionality (e.g., 384)
    /// * `metric` - Distance metric for new collections
    /// * `model` - Encoder model name recorded in the manifest
    pub async fn open(
        db_path: &Path,
        collection: &str,
        dimensions: usize,
        metric: DistanceMetric,
        model: &str,
    ) -> AppResult<Self> {
        validate_collection_name(collection)?;

        std::fs::create_dir_all(db_path).map_err(|e| {
            AppError::Knowledge(format!("Failed to create index directory {:?}: {}", db_path, e))
        })?;

        let conn = connect(db_path).await?;
        let table_names = conn
            .table_names()
            .execute()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to list tables: {}", e)))?;

        let existing = IndexManifest::read(db_path, collection)?;
        let manifest = match existing {
            Some(manifest) => {
                if manifest.metric != metric {
                    return Err(AppError::Knowledge(format!(
                        "Collection '{}' was created with the {} metric, not {}",
                        collection, manifest.metric, metric
                    )));
                }
                if manifest.dimensions != dimensions {
                    return Err(AppError::Knowledge(format!(
                        "Collection '{}' stores {}-dimensional vectors, encoder produces {}",
                        collection, manifest.dimensions, dimensions
                    )));
                }
                if manifest.model != model {
                    tracing::warn!(
                        collection = %collection,
                        "Collection was built with encoder '{}', now using '{}'",
                        manifest.model,
                        model
                    );
                }
                manifest
            }
            None => {
                let manifest = IndexManifest {
                    collection: collection.to_string(),
                    metric,
                    dimensions,
                    model: model.to_string(),
                    created_at: Utc::now(),
                };
                manifest.write(db_path)?;
                manifest
            }
        };

        let table = if table_names.iter().any(|name| name == collection) {
            conn.open_table(collection)
                .execute()
                .await
                .map_err(|e| AppError::Knowledge(format!("Failed to open table: {}", e)))?
        } else {
            conn.create_empty_table(collection, create_schema(dimensions))
                .execute()
                .await
                .map_err(|e| AppError::Knowledge(format!("Failed to create table: {}", e)))?
        };

        tracing::debug!(
            collection = %collection,
            metric = %manifest.metric,
            dimensions = manifest.dimensions,
            "Opened LanceDB collection at {:?}",
            db_path
        );

        Ok(Self { table, manifest })
    }

    /// Open a collection that must already exist.
    ///
    /// Fails with `NotFound` when the store or collection is missing.
    pub async fn open_existing(db_path: &Path, collection: &str) -> AppResult<Self> {
        if !db_path.exists() {
            return Err(AppError::NotFound(format!(
                "Index directory does not exist: {:?}",
                db_path
            )));
        }

        let manifest = IndexManifest::read(db_path, collection)?.ok_or_else(|| {
            AppError::NotFound(format!(
                "Collection '{}' does not exist in {:?}",
                collection, db_path
            ))
        })?;

        Self::open(
            db_path,
            collection,
            manifest.dimensions,
            manifest.metric,
            &manifest.model,
        )
        .await
    }

    /// Manifest of the open collection.
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    fn entries_to_batch(&self, entries: &[IndexEntry]) -> AppResult<RecordBatch> {
        let schema = create_schema(self.manifest.dimensions);

        let ids = StringArray::from_iter_values(entries.iter().map(|e| e.id.as_str()));
        let texts = StringArray::from_iter_values(entries.iter().map(|e| e.text.as_str()));
        let sources =
            StringArray::from_iter_values(entries.iter().map(|e| e.metadata.source.as_str()));
        let domains =
            StringArray::from_iter_values(entries.iter().map(|e| e.metadata.domain.as_str()));

        let values = Float32Array::from_iter_values(
            entries.iter().flat_map(|e| e.vector.iter().copied()),
        );
        let vectors = FixedSizeListArray::try_new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            self.manifest.dimensions as i32,
            Arc::new(values),
            None,
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to build vector column: {}", e)))?;

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(ids),
                Arc::new(texts),
                Arc::new(sources),
                Arc::new(domains),
                Arc::new(vectors),
            ],
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to create RecordBatch: {}", e)))
    }

    /// Ids from `ids` that are already stored.
    async fn existing_ids(&self, ids: &[&str]) -> AppResult<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let batches: Vec<RecordBatch> = self
            .table
            .query()
            .only_if(id_filter(ids))
            .select(Select::columns(&["id"]))
            .execute()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to look up ids: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to collect ids: {}", e)))?;

        let mut found = Vec::new();
        for batch in &batches {
            let column = string_column(batch, "id")?;
            for row in 0..batch.num_rows() {
                found.push(column.value(row).to_string());
            }
        }
        Ok(found)
    }

    fn batch_to_hits(&self, batch: &RecordBatch, query: &[f32]) -> AppResult<Vec<QueryHit>> {
        let ids = string_column(batch, "id")?;
        let texts = string_column(batch, "text")?;
        let sources = string_column(batch, "source")?;
        let domains = string_column(batch, "domain")?;
        let vectors = batch
            .column_by_name(VECTOR_COLUMN)
            .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
            .ok_or_else(|| AppError::Knowledge("Invalid vector column".to_string()))?;

        let mut hits = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let values = vectors.value(row);
            let values = values
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| AppError::Knowledge("Invalid vector values".to_string()))?;

            hits.push(QueryHit {
                id: ids.value(row).to_string(),
                text: texts.value(row).to_string(),
                metadata: EntryMetadata::new(sources.value(row), domains.value(row)),
                distance: distance(self.manifest.metric, query, values.values()),
            });
        }
        Ok(hits)
    }
}

#[async_trait::async_trait]
impl VectorIndex for LanceDbIndex {
    fn collection(&self) -> &str {
        &self.manifest.collection
    }

    fn metric(&self) -> DistanceMetric {
        self.manifest.metric
    }

    fn dimensions(&self) -> usize {
        self.manifest.dimensions
    }

    async fn count(&self) -> AppResult<usize> {
        self.table
            .count_rows(None)
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to count rows: {}", e)))
    }

    async fn add(&self, entries: Vec<IndexEntry>) -> AppResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        validate_entries(&entries, self.manifest.dimensions)?;

        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        let existing = self.existing_ids(&ids).await?;
        if let Some(id) = existing.first() {
            return Err(AppError::DuplicateId(format!(
                "'{}' already exists in collection '{}' ({} duplicate(s) in batch)",
                id,
                self.manifest.collection,
                existing.len()
            )));
        }

        let batch = self.entries_to_batch(&entries)?;
        let schema = batch.schema();
        self.table
            .add(RecordBatchIterator::new(vec![Ok(batch)], schema))
            .execute()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to add entries: {}", e)))?;

        tracing::debug!(
            collection = %self.manifest.collection,
            count = entries.len(),
            "Inserted entries into LanceDB"
        );

        Ok(entries.len())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> AppResult<Vec<QueryHit>> {
        validate_query(vector, top_k, self.manifest.dimensions)?;

        let distance_type = match self.manifest.metric {
            DistanceMetric::Cosine => DistanceType::Cosine,
            DistanceMetric::L2 => DistanceType::L2,
        };

        let batches: Vec<RecordBatch> = self
            .table
            .query()
            .nearest_to(vector)
            .map_err(|e| AppError::Knowledge(format!("Failed to create query: {}", e)))?
            .column(VECTOR_COLUMN)
            .distance_type(distance_type)
            .limit(top_k)
            .execute()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to execute search: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to collect results: {}", e)))?;

        let mut hits = Vec::new();
        for batch in &batches {
            hits.extend(self.batch_to_hits(batch, vector)?);
        }

        // Distances are recomputed from stored vectors so every backend
        // reports the same values
        let hits = rank_hits(hits, top_k);

        tracing::debug!(
            collection = %self.manifest.collection,
            top_k,
            returned = hits.len(),
            "LanceDB query complete"
        );

        Ok(hits)
    }

    async fn delete(&self, ids: &[String]) -> AppResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let before = self.count().await?;
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        self.table
            .delete(&id_filter(&refs))
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to delete entries: {}", e)))?;
        let after = self.count().await?;

        Ok(before.saturating_sub(after))
    }

    async fn clear(&self) -> AppResult<()> {
        if self.count().await? > 0 {
            self.table
                .delete("id IS NOT NULL")
                .await
                .map_err(|e| AppError::Knowledge(format!("Failed to clear collection: {}", e)))?;
        }

        tracing::info!(collection = %self.manifest.collection, "Cleared LanceDB collection");
        Ok(())
    }
}

async fn connect(db_path: &Path) -> AppResult<lancedb::Connection> {
    let uri = db_path.to_string_lossy().to_string();
    lancedb::connect(&uri)
        .execute()
        .await
        .map_err(|e| AppError::Knowledge(format!("Failed to connect to LanceDB: {}", e)))
}

/// Arrow schema of a collection table.
fn create_schema(dimensions: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("domain", DataType::Utf8, false),
        Field::new(
            VECTOR_COLUMN,
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dimensions as i32,
            ),
            false,
        ),
    ]))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| AppError::Knowledge(format!("Invalid {} column", name)))
}

/// SQL predicate `id IN ('a', 'b')` with quotes escaped.
fn id_filter(ids: &[&str]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("'{}'", id.replace('\'', "''")))
        .collect();
    format!("id IN ({})", quoted.join(", "))
}

fn validate_collection_name(name: &str) -> AppResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "Invalid collection name '{}': use letters, digits, '_' or '-'",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: &str, vector: Vec<f32>, source: &str) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            vector,
            text: format!("text {}", id),
            metadata: EntryMetadata::new(source, "general"),
        }
    }

    #[test]
    fn test_id_filter_escapes_quotes() {
        assert_eq!(id_filter(&["a", "o'neil"]), "id IN ('a', 'o''neil')");
    }

    #[test]
    fn test_collection_name_validation() {
        assert!(validate_collection_name("medical_kb").is_ok());
        assert!(validate_collection_name("../escape").is_err());
        assert!(validate_collection_name("").is_err());
    }

    #[tokio::test]
    async fn test_add_query_and_persist() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("vector_db");

        {
            let index = LanceDbIndex::open(&db_path, "kb", 3, DistanceMetric::Cosine, "test")
                .await
                .unwrap();
            index
                .add(vec![
                    entry("a", vec![1.0, 0.0, 0.0], "PubMed"),
                    entry("b", vec![0.0, 1.0, 0.0], "WHO"),
                ])
                .await
                .unwrap();
        }

        let reopened = LanceDbIndex::open_existing(&db_path, "kb").await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);

        let hits = reopened.query(&[0.9, 0.1, 0.0], 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[0].metadata.source, "PubMed");
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let temp = TempDir::new().unwrap();
        let index = LanceDbIndex::open(temp.path(), "kb", 2, DistanceMetric::Cosine, "test")
            .await
            .unwrap();

        index.add(vec![entry("a", vec![1.0, 0.0], "x")]).await.unwrap();
        let result = index
            .add(vec![entry("b", vec![0.0, 1.0], "x"), entry("a", vec![1.0, 1.0], "x")])
            .await;

        assert!(matches!(result, Err(AppError::DuplicateId(_))));
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_metric_mismatch_on_reopen() {
        let temp = TempDir::new().unwrap();
        LanceDbIndex::open(temp.path(), "kb", 2, DistanceMetric::Cosine, "test")
            .await
            .unwrap();

        let result = LanceDbIndex::open(temp.path(), "kb", 2, DistanceMetric::L2, "test").await;
        assert!(matches!(result, Err(AppError::Knowledge(_))));

        let result = LanceDbIndex::open(temp.path(), "kb", 4, DistanceMetric::Cosine, "test").await;
        assert!(matches!(result, Err(AppError::Knowledge(_))));
    }

    #[tokio::test]
    async fn test_collections_share_root() {
        let temp = TempDir::new().unwrap();
        let first = LanceDbIndex::open(temp.path(), "first", 2, DistanceMetric::Cosine, "test")
            .await
            .unwrap();
        let second = LanceDbIndex::open(temp.path(), "second", 2, DistanceMetric::Cosine, "test")
            .await
            .unwrap();

        first.add(vec![entry("a", vec![1.0, 0.0], "x")]).await.unwrap();

        assert_eq!(first.count().await.unwrap(), 1);
        assert_eq!(second.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let temp = TempDir::new().unwrap();
        let index = LanceDbIndex::open(temp.path(), "kb", 2, DistanceMetric::Cosine, "test")
            .await
            .unwrap();
        index
            .add(vec![
                entry("a", vec![1.0, 0.0], "x"),
                entry("b", vec![0.0, 1.0], "x"),
                entry("c", vec![1.0, 1.0], "x"),
            ])
            .await
            .unwrap();

        assert_eq!(index.delete(&["b".to_string()]).await.unwrap(), 1);
        assert_eq!(index.count().await.unwrap(), 2);

        index.clear().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_existing_missing() {
        let temp = TempDir::new().unwrap();
        let result = LanceDbIndex::open_existing(&temp.path().join("nope"), "kb").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
