//! Embedding encoder.
//!
//! `Encoder` wraps one provider for the lifetime of the process and checks
//! every vector it hands out: one per input, all of the provider's
//! dimensionality.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};

use medrag_core::config::EmbeddingConfig;
use medrag_core::{AppError, AppResult};
use std::path::Path;
use std::sync::Arc;

/// Shared text encoder.
#[derive(Debug, Clone)]
pub struct Encoder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl Encoder {
    /// Wrap an existing provider.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            batch_size: 32,
        }
    }

    /// Set how many texts go to the provider per call.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Build the configured provider (loading model weights if any).
    pub async fn from_config(config: &EmbeddingConfig, model_dir: Option<&Path>) -> AppResult<Self> {
        tracing::debug!(
            provider = %config.provider,
            model = %config.model,
            dimensions = config.dimensions,
            "Creating embedding encoder"
        );

        let provider = create_provider(config, model_dir).await?;
        Ok(Self::new(provider).with_batch_size(config.batch_size))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Encode one text.
    pub async fn encode(&self, text: &str) -> AppResult<Vec<f32>> {
        let vector = self.provider.embed(text).await?;
        self.check_dimensions(&vector)?;
        Ok(vector)
    }

    /// Encode many texts, in order.
    pub async fn encode_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let embedded = self.provider.embed_batch(batch).await?;
            if embedded.len() != batch.len() {
                return Err(AppError::Knowledge(format!(
                    "Encoder returned {} vectors for {} texts",
                    embedded.len(),
                    batch.len()
                )));
            }
            for vector in &embedded {
                self.check_dimensions(vector)?;
            }
            vectors.extend(embedded);
        }

        tracing::debug!(
            count = vectors.len(),
            model = %self.model_name(),
            "Encoded texts"
        );

        Ok(vectors)
    }

    fn check_dimensions(&self, vector: &[f32]) -> AppResult<()> {
        if vector.len() != self.dimensions() {
            return Err(AppError::Knowledge(format!(
                "Encoder returned {} dimensions, expected {}",
                vector.len(),
                self.dimensions()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::trigram::TrigramProvider;

    #[derive(Debug)]
    struct ShortProvider;

    #[async_trait::async_trait]
    impl EmbeddingProvider for ShortProvider {
        fn provider_name(&self) -> &str {
            "short"
        }

        fn model_name(&self) -> &str {
            "short-v1"
        }

        fn dimensions(&self) -> usize {
            4
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[tokio::test]
    async fn test_batches_are_split_and_ordered() {
        let encoder = Encoder::new(Arc::new(TrigramProvider::new(64))).with_batch_size(2);
        let texts: Vec<String> = ["asthma inhaler", "migraine aura", "anemia iron", "gout diet", "acne"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let batched = encoder.encode_batch(&texts).await.unwrap();
        assert_eq!(batched.len(), 5);

        for (text, vector) in texts.iter().zip(batched.iter()) {
            let single = encoder.encode(text).await.unwrap();
            for (a, b) in single.iter().zip(vector.iter()) {
                assert!((a - b).abs() < 1e-5);
            }
        }
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_error() {
        let encoder = Encoder::new(Arc::new(ShortProvider));

        assert!(matches!(
            encoder.encode("x").await,
            Err(AppError::Knowledge(_))
        ));
        assert!(encoder.encode_batch(&["x".to_string()]).await.is_err());
    }

    #[tokio::test]
    async fn test_from_config() {
        let encoder = Encoder::from_config(&EmbeddingConfig::default(), None)
            .await
            .unwrap();

        assert_eq!(encoder.provider_name(), "trigram");
        assert_eq!(encoder.dimensions(), 384);
    }
}
