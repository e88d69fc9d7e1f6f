//! Integration-style tests over the whole retrieval flow.
//!
//! The offline trigram encoder stands in for a pretrained model, the
//! in-memory index for LanceDB where persistence is not under test, and
//! scripted clients for the generative model.


use crate::embeddings::providers::trigram::TrigramProvider;
use crate::embeddings::Encoder;
use crate::memory_index::InMemoryIndex;
use crate::pipeline::{KnowledgeContext, Pipeline};
use crate::rag::AnswerGenerator;
use crate::vector_index::VectorIndex;
use medrag_core::config::GenerationConfig;
use medrag_core::{AppError, AppResult, DistanceMetric};
use medrag_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub(crate) const TEST_DIMENSIONS: usize = 128;

pub(crate) const DIABETES: &str = r#"{"id": "doc_diabetes", "title": "Diabetes", "text": "Diabetes is a chronic condition marked by high blood sugar. Common symptoms include excessive thirst and frequent urination.", "source": "WHO", "domain": "endocrinology"}"#;
pub(crate) const HYPERTENSION: &str = r#"{"id": "doc_hypertension", "title": "Hypertension", "text": "Hypertension means persistently elevated arterial pressure, raising the risk of stroke and heart disease.", "source": "PubMed", "domain": "cardiology"}"#;
pub(crate) const FLU: &str = r#"{"id": "doc_flu", "title": "Influenza", "text": "Influenza is a contagious respiratory infection causing fever, cough and muscle aches.", "source": "CDC", "domain": "infectious diseases"}"#;

/// Replies with a fixed answer and counts calls.
pub(crate) struct CannedClient {
    pub answer: String,
    pub calls: AtomicUsize,
}

impl CannedClient {
    pub fn new(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: answer.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LlmClient for CannedClient {
    fn provider_name(&self) -> &str {
        "canned"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(LlmResponse {
            content: self.answer.clone(),
            model: request.model.clone(),
            usage: LlmUsage::new(100, 10),
        })
    }
}

/// Fails every call like an unreachable endpoint.
pub(crate) struct FailingClient;

#[async_trait::async_trait]
impl LlmClient for FailingClient {
    fn provider_name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
        Err(AppError::Llm("connection refused".to_string()))
    }
}

pub(crate) fn encoder() -> Encoder {
    Encoder::new(Arc::new(TrigramProvider::new(TEST_DIMENSIONS))).with_batch_size(2)
}

pub(crate) fn memory_index() -> Arc<dyn VectorIndex> {
    Arc::new(InMemoryIndex::new(
        "medical_kb",
        TEST_DIMENSIONS,
        DistanceMetric::Cosine,
    ))
}

pub(crate) fn generator(client: Arc<dyn LlmClient>) -> Arc<AnswerGenerator> {
    let generator = AnswerGenerator::from_config(&GenerationConfig::default(), client)
        .unwrap()
        .with_timeout(Duration::from_secs(2));
    Arc::new(generator)
}

/// Write a corpus file with one line per record.
pub(crate) fn write_corpus(dir: &Path, lines: &[&str]) -> PathBuf {
    let path = dir.join("corpus.jsonl");
    let mut contents = lines.join("\n");
    if !contents.is_empty() {
        contents.push('\n');
    }
    std::fs::write(&path, contents).unwrap();
    path
}

pub(crate) fn pipeline_with(
    corpus: &Path,
    index: Arc<dyn VectorIndex>,
    client: Arc<dyn LlmClient>,
) -> Pipeline {
    let context = KnowledgeContext::new(encoder(), index, generator(client));
    Pipeline::new(context, corpus)
}
