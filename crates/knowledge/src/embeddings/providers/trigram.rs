//! Offline embedding provider built from hashed words and character trigrams.

use crate::embeddings::provider::EmbeddingProvider;
use medrag_core::AppResult;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

/// Model identifier reported by this provider.
pub const TRIGRAM_MODEL: &str = "trigram-v1";

/// Words carrying no topical signal in questions or abstracts.
const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what", "who", "how", "why", "when", "does", "can",
    "not", "may", "also", "often", "into", "than", "these", "those", "such", "there",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

/// Trigram-based embedding provider for local, offline operation.
///
/// Each content word contributes its own hashed dimension plus one per
/// character trigram, so "diabetes" and "diabetic" land close together.
/// Vectors are unit-normalised; empty input yields the zero vector.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    /// Create a new trigram provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Lowercased content words with their frequencies, in stable order.
    fn word_counts(text: &str) -> BTreeMap<String, u32> {
        let mut counts = BTreeMap::new();
        let lower = text.to_lowercase();

        for word in lower.split(|c: char| !c.is_alphanumeric()) {
            if word.chars().count() <= 2 || stop_words().contains(word) {
                continue;
            }
            *counts.entry(word.to_string()).or_insert(0) += 1;
        }

        counts
    }

    fn bucket(&self, feature: &str, seed: u64) -> usize {
        let hash = feature
            .bytes()
            .fold(seed, |acc, b| acc.wrapping_mul(1_099_511_628_211).wrapping_add(b as u64));
        (hash % self.dimensions as u64) as usize
    }

    fn encode_one(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        for (word, freq) in Self::word_counts(text) {
            let weight = freq as f32;

            // Whole word
            embedding[self.bucket(&word, 31)] += weight;

            // Padded character trigrams
            let chars: Vec<char> = format!(" {} ", word).chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                embedding[self.bucket(&trigram, 37)] += weight.sqrt() * 0.5;
            }
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        TRIGRAM_MODEL
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.encode_one(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::cosine_similarity;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn test_trigram_provider_dimensions() {
        let provider = TrigramProvider::new(384);
        assert_eq!(provider.dimensions(), 384);
        assert_eq!(provider.provider_name(), "trigram");
        assert_eq!(provider.model_name(), "trigram-v1");
    }

    #[tokio::test]
    async fn test_embed_is_unit_length() {
        let provider = TrigramProvider::new(384);
        let embedding = provider.embed("chronic kidney disease").await.unwrap();

        assert_eq!(embedding.len(), 384);
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let provider = TrigramProvider::new(384);
        let texts = vec![
            "insulin resistance".to_string(),
            "influenza vaccine".to_string(),
        ];

        let batch = provider.embed_batch(&texts).await.unwrap();
        let single = provider.embed(&texts[0]).await.unwrap();

        assert_eq!(batch.len(), 2);
        for (a, b) in batch[0].iter().zip(single.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn test_deterministic() {
        let provider = TrigramProvider::new(384);
        let text = "persistent cough and fever";

        let first = provider.embed(text).await.unwrap();
        let second = provider.embed(text).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_punctuation_does_not_change_words() {
        let provider = TrigramProvider::new(384);

        let plain = provider.embed("blood sugar").await.unwrap();
        let punctuated = provider.embed("Blood sugar?").await.unwrap();
        assert_eq!(plain, punctuated);
    }

    #[tokio::test]
    async fn test_related_text_is_closer() {
        let provider = TrigramProvider::new(384);

        let query = provider.embed("high blood sugar symptoms").await.unwrap();
        let related = provider
            .embed("Diabetes causes high blood sugar and frequent urination")
            .await
            .unwrap();
        let unrelated = provider
            .embed("Influenza spreads through respiratory droplets")
            .await
            .unwrap();

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let provider = TrigramProvider::new(384);
        let embedding = provider.embed("").await.unwrap();

        assert_eq!(embedding.len(), 384);
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_non_ascii_text() {
        let provider = TrigramProvider::new(384);
        let embedding = provider
            .embed("Fièvre et céphalée persistantes après l'infection")
            .await
            .unwrap();

        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }
}
