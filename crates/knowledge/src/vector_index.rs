//! Vector index abstraction.
//!
//! A collection holds `(id, vector, text, metadata)` entries under one fixed
//! distance metric and dimensionality. Queries return the nearest entries in
//! ascending distance order.

use crate::types::{IndexEntry, QueryHit};
use medrag_core::{AppError, AppResult, DistanceMetric};
use std::collections::HashSet;

/// Trait for vector index backends.
///
/// Implementations must support:
/// - Counting entries
/// - Appending entries (duplicate ids are rejected, nothing is written)
/// - Exact or approximate top-k search
/// - Deleting entries and clearing the collection
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Collection name.
    fn collection(&self) -> &str;

    /// Metric fixed at collection creation.
    fn metric(&self) -> DistanceMetric;

    /// Vector dimensionality fixed at collection creation.
    fn dimensions(&self) -> usize;

    /// Number of entries currently stored.
    async fn count(&self) -> AppResult<usize>;

    /// Append entries.
    ///
    /// Fails with `DuplicateId` if an id is already stored or repeats inside
    /// `entries`. Returns the number of entries written.
    async fn add(&self, entries: Vec<IndexEntry>) -> AppResult<usize>;

    /// Return up to `top_k` nearest entries, closest first.
    async fn query(&self, vector: &[f32], top_k: usize) -> AppResult<Vec<QueryHit>>;

    /// Remove entries by id; unknown ids are ignored. Returns the number removed.
    async fn delete(&self, ids: &[String]) -> AppResult<usize>;

    /// Remove every entry, keeping metric and dimensionality.
    async fn clear(&self) -> AppResult<()>;
}

/// Check a batch before it is written: dimensionality and in-batch duplicates.
pub(crate) fn validate_entries(entries: &[IndexEntry], dimensions: usize) -> AppResult<()> {
    let mut seen = HashSet::with_capacity(entries.len());

    for entry in entries {
        if entry.vector.len() != dimensions {
            return Err(AppError::Knowledge(format!(
                "Embedding dimension mismatch for '{}': expected {}, got {}",
                entry.id,
                dimensions,
                entry.vector.len()
            )));
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(AppError::DuplicateId(format!(
                "'{}' appears more than once in the batch",
                entry.id
            )));
        }
    }

    Ok(())
}

/// Check query arguments.
pub(crate) fn validate_query(vector: &[f32], top_k: usize, dimensions: usize) -> AppResult<()> {
    if top_k == 0 {
        return Err(AppError::Input("top_k must be at least 1".to_string()));
    }
    if vector.len() != dimensions {
        return Err(AppError::Knowledge(format!(
            "Query embedding dimension mismatch: expected {}, got {}",
            dimensions,
            vector.len()
        )));
    }
    Ok(())
}

/// Sort ascending by distance and keep the first `top_k`.
pub(crate) fn rank_hits(mut hits: Vec<QueryHit>, top_k: usize) -> Vec<QueryHit> {
    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(top_k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryMetadata;

    fn entry(id: &str, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            vector,
            text: id.to_string(),
            metadata: EntryMetadata::default(),
        }
    }

    fn hit(id: &str, distance: f32) -> QueryHit {
        QueryHit {
            id: id.to_string(),
            text: id.to_string(),
            metadata: EntryMetadata::default(),
            distance,
        }
    }

    #[test]
    fn test_in_batch_duplicate() {
        let entries = vec![entry("a", vec![1.0, 0.0]), entry("a", vec![0.0, 1.0])];
        assert!(matches!(
            validate_entries(&entries, 2),
            Err(AppError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let entries = vec![entry("a", vec![1.0, 0.0, 0.0])];
        assert!(matches!(
            validate_entries(&entries, 2),
            Err(AppError::Knowledge(_))
        ));
    }

    #[test]
    fn test_top_k_zero() {
        assert!(matches!(
            validate_query(&[1.0, 0.0], 0, 2),
            Err(AppError::Input(_))
        ));
    }

    #[test]
    fn test_rank_hits_orders_and_truncates() {
        let ranked = rank_hits(vec![hit("c", 0.9), hit("a", 0.1), hit("b", 0.5)], 2);
        let ids: Vec<&str> = ranked.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
