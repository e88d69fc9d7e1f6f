//! Question retrieval: encode, search, return parallel texts and metadata.

use crate::embeddings::Encoder;
use crate::types::Retrieval;
use crate::vector_index::VectorIndex;
use medrag_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Instant;

/// Default number of passages returned per question.
pub const DEFAULT_TOP_K: usize = 3;

/// Retrieves the passages closest to a question.
#[derive(Clone)]
pub struct Retriever {
    encoder: Encoder,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(encoder: Encoder, index: Arc<dyn VectorIndex>) -> Self {
        Self { encoder, index }
    }

    /// Encode `question` and return its `top_k` nearest passages, rank 0 first.
    ///
    /// # Errors
    /// * `Input` for a blank question or `top_k == 0`
    /// * `EmptyIndex` when the collection has no entries
    pub async fn retrieve(&self, question: &str, top_k: usize) -> AppResult<Retrieval> {
        let start = Instant::now();

        if question.trim().is_empty() {
            return Err(AppError::Input("Question must not be empty".to_string()));
        }
        if top_k == 0 {
            return Err(AppError::Input("top_k must be at least 1".to_string()));
        }

        if self.index.count().await? == 0 {
            return Err(AppError::EmptyIndex(self.index.collection().to_string()));
        }

        let vector = self.encoder.encode(question).await?;
        let hits = self.index.query(&vector, top_k).await?;
        let retrieval = Retrieval::from(hits);

        tracing::info!(
            collection = %self.index.collection(),
            top_k,
            returned = retrieval.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Retrieved context"
        );

        Ok(retrieval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::trigram::TrigramProvider;
    use crate::memory_index::InMemoryIndex;
    use crate::types::{Document, IndexEntry};
    use medrag_core::DistanceMetric;

    async fn retriever_with(docs: &[Document]) -> Retriever {
        let encoder = Encoder::new(Arc::new(TrigramProvider::new(128)));
        let index = Arc::new(InMemoryIndex::new("kb", 128, DistanceMetric::Cosine));

        let texts: Vec<String> = docs.iter().map(|d| d.indexed_text()).collect();
        let vectors = encoder.encode_batch(&texts).await.unwrap();
        let entries = docs
            .iter()
            .zip(vectors)
            .map(|(doc, vector)| IndexEntry::from_document(doc, vector))
            .collect();
        index.add(entries).await.unwrap();

        Retriever::new(encoder, index)
    }

    #[tokio::test]
    async fn test_parallel_sequences() {
        let retriever = retriever_with(&[
            Document::new("1", "Asthma narrows the airways.").with_source("NHS"),
            Document::new("2", "Migraine causes throbbing headaches.").with_source("Mayo"),
            Document::new("3", "Anemia lowers red blood cells."),
        ])
        .await;

        let retrieval = retriever.retrieve("airways asthma", 2).await.unwrap();

        assert_eq!(retrieval.texts.len(), 2);
        assert_eq!(retrieval.metadatas.len(), 2);
        assert_eq!(retrieval.distances.len(), 2);
        assert_eq!(retrieval.texts[0], "Asthma narrows the airways.");
        assert_eq!(retrieval.metadatas[0].source, "NHS");
        assert!(retrieval.distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_empty_index_error() {
        let retriever = retriever_with(&[]).await;

        match retriever.retrieve("anything", 3).await {
            Err(AppError::EmptyIndex(collection)) => assert_eq!(collection, "kb"),
            other => panic!("Expected EmptyIndex, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_question_rejected() {
        let retriever = retriever_with(&[Document::new("1", "Gout affects joints.")]).await;
        assert!(matches!(
            retriever.retrieve("   ", 3).await,
            Err(AppError::Input(_))
        ));
    }
}
