//! Pretrained BERT sentence encoder (all-MiniLM-L6-v2 and compatible models).
//!
//! Loads `config.json`, `tokenizer.json` and `model.safetensors` from a local
//! directory and runs inference with candle on the CPU. Sentence vectors are
//! the attention-masked mean of the last hidden state, L2-normalised.

use crate::embeddings::provider::EmbeddingProvider;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use medrag_core::config::EmbeddingConfig;
use medrag_core::{AppError, AppResult};
use std::path::Path;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// Longest token sequence fed to the model.
const MAX_SEQUENCE_LEN: usize = 256;

fn model_err(context: &str, e: impl std::fmt::Display) -> AppError {
    AppError::Knowledge(format!("{}: {}", context, e))
}

/// Local BERT sentence encoder.
pub struct MiniLmProvider {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_name: String,
    dimensions: usize,
}

impl std::fmt::Debug for MiniLmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniLmProvider")
            .field("model_name", &self.model_name)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl MiniLmProvider {
    /// Load the model once; weights stay resident for the provider's lifetime.
    pub fn load(config: &EmbeddingConfig, model_dir: &Path) -> AppResult<Self> {
        let device = Device::Cpu;

        let config_path = model_dir.join("config.json");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let weights_path = model_dir.join("model.safetensors");

        for path in [&config_path, &tokenizer_path, &weights_path] {
            if !path.exists() {
                return Err(AppError::NotFound(format!(
                    "Encoder model file missing: {:?}",
                    path
                )));
            }
        }

        tracing::info!("Loading sentence encoder from {:?}", model_dir);

        let bert_config: BertConfig =
            serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;

        if bert_config.hidden_size != config.dimensions {
            return Err(AppError::Config(format!(
                "Encoder at {:?} produces {} dimensions, embedding.dimensions is {}",
                model_dir, bert_config.hidden_size, config.dimensions
            )));
        }

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| model_err("Failed to load tokenizer", e))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LEN,
                ..Default::default()
            }))
            .map_err(|e| model_err("Failed to configure truncation", e))?;

        // SAFETY: the weights file is not modified while mapped
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                .map_err(|e| model_err("Failed to map model weights", e))?
        };
        let model =
            BertModel::load(vb, &bert_config).map_err(|e| model_err("Failed to build model", e))?;

        tracing::info!(
            model = %config.model,
            dimensions = bert_config.hidden_size,
            "Sentence encoder ready"
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            model_name: config.model.clone(),
            dimensions: bert_config.hidden_size,
        })
    }

    fn encode_texts(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| model_err("Tokenization failed", e))?;

        let mut ids = Vec::with_capacity(encodings.len());
        let mut masks = Vec::with_capacity(encodings.len());
        for encoding in &encodings {
            ids.push(
                Tensor::new(encoding.get_ids(), &self.device)
                    .map_err(|e| model_err("Failed to build input tensor", e))?,
            );
            masks.push(
                Tensor::new(encoding.get_attention_mask(), &self.device)
                    .map_err(|e| model_err("Failed to build mask tensor", e))?,
            );
        }

        let run = || -> candle_core::Result<Vec<Vec<f32>>> {
            let input_ids = Tensor::stack(&ids, 0)?;
            let attention_mask = Tensor::stack(&masks, 0)?;
            let token_type_ids = input_ids.zeros_like()?;

            let hidden = self
                .model
                .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

            // Masked mean over the sequence axis: [B, T, H] -> [B, H]
            let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
            let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
            let lengths = mask.sum(1)?.clamp(1e-9f32, f32::MAX)?;
            let mean = summed.broadcast_div(&lengths)?;

            let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12f32, f32::MAX)?;
            mean.broadcast_div(&norm)?.to_vec2::<f32>()
        };

        run().map_err(|e| model_err("Encoder inference failed", e))
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MiniLmProvider {
    fn provider_name(&self) -> &str {
        "minilm"
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.encode_texts(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_model_files() {
        let temp = TempDir::new().unwrap();
        let config = EmbeddingConfig {
            provider: "minilm".to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            ..EmbeddingConfig::default()
        };

        let result = MiniLmProvider::load(&config, temp.path());
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
