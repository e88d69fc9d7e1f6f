//! Embedding provider trait and factory.

use medrag_core::config::EmbeddingConfig;
use medrag_core::{AppError, AppResult};
use std::path::Path;
use std::sync::Arc;

/// Trait for embedding providers.
///
/// Implementations must be deterministic for a given model: embedding the
/// same text twice yields the same vector, and a batch yields the same
/// vectors as per-item calls.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "ollama", "minilm")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Knowledge("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
///
/// `model_dir` is the resolved local model directory used by `minilm`.
pub async fn create_provider(
    config: &EmbeddingConfig,
    model_dir: Option<&Path>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    if config.dimensions == 0 {
        return Err(AppError::Config(
            "Embedding dimensions must be greater than zero".to_string(),
        ));
    }

    match config.provider.as_str() {
        "trigram" => {
            let provider = super::providers::trigram::TrigramProvider::new(config.dimensions);
            Ok(Arc::new(provider))
        }

        "ollama" => {
            let provider = super::providers::ollama::OllamaProvider::new(config).await?;
            Ok(Arc::new(provider))
        }

        #[cfg(feature = "local-model")]
        "minilm" => {
            let dir = model_dir.ok_or_else(|| {
                AppError::Config(
                    "The minilm provider needs embedding.modelDir (config.json, tokenizer.json, model.safetensors)"
                        .to_string(),
                )
            })?;
            let provider = super::providers::minilm::MiniLmProvider::load(config, dir)?;
            Ok(Arc::new(provider))
        }

        #[cfg(not(feature = "local-model"))]
        "minilm" => {
            let _ = model_dir;
            Err(AppError::Config(
                "The minilm provider requires building with the `local-model` feature".to_string(),
            ))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: {}",
            config.provider,
            medrag_core::config::EMBEDDING_PROVIDERS.join(", ")
        ))),
    }
}
