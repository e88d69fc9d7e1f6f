//! Question answering facade.
//!
//! `KnowledgeContext` owns the process-wide resources (encoder, open index,
//! answer generator). `Pipeline` adds the build state machine on top:
//!
//! ```text
//! Uninitialized --initialize--> Indexing --ok--> Ready
//!                                   |
//!                                   +--error--> Uninitialized
//! ```
//!
//! `Ready` is terminal; `rebuild` goes back through `Indexing` and returns
//! to the previous state if it fails.

use crate::embeddings::Encoder;
use crate::ingest::{build_index, rebuild_index};
use crate::lancedb_index::LanceDbIndex;
use crate::progress::ProgressReporter;
use crate::rag::{AnswerGenerator, RagResponse};
use crate::retriever::{Retriever, DEFAULT_TOP_K};
use crate::types::{BuildStats, IndexStats};
use crate::vector_index::VectorIndex;
use medrag_core::{AppConfig, AppError, AppResult};
use medrag_llm::create_client;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Open the configured LanceDB collection for `encoder`.
pub async fn open_index(config: &AppConfig, encoder: &Encoder) -> AppResult<Arc<dyn VectorIndex>> {
    let index = LanceDbIndex::open(
        &config.index_path(),
        &config.index.collection,
        encoder.dimensions(),
        config.index.metric,
        encoder.model_name(),
    )
    .await?;

    Ok(Arc::new(index))
}

/// Shared resources used to answer questions.
#[derive(Clone)]
pub struct KnowledgeContext {
    encoder: Encoder,
    index: Arc<dyn VectorIndex>,
    generator: Arc<AnswerGenerator>,
}

impl KnowledgeContext {
    pub fn new(encoder: Encoder, index: Arc<dyn VectorIndex>, generator: Arc<AnswerGenerator>) -> Self {
        Self {
            encoder,
            index,
            generator,
        }
    }

    /// Load the encoder, open the index and connect the generator.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let model_dir = config.embedding_model_dir();
        let encoder = Encoder::from_config(&config.embedding, model_dir.as_deref()).await?;
        let index = open_index(config, &encoder).await?;

        let api_key = config.resolve_api_key();
        let client = create_client(&config.generation, api_key.as_deref())?;
        let generator = AnswerGenerator::from_config(&config.generation, client)?;

        Ok(Self::new(encoder, index, Arc::new(generator)))
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub fn generator(&self) -> &AnswerGenerator {
        &self.generator
    }

    pub fn retriever(&self) -> Retriever {
        Retriever::new(self.encoder.clone(), self.index.clone())
    }

    /// Entry count and layout of the collection.
    pub async fn stats(&self) -> AppResult<IndexStats> {
        Ok(IndexStats {
            collection: self.index.collection().to_string(),
            entries: self.index.count().await?,
            metric: self.index.metric().as_str().to_string(),
            dimensions: self.index.dimensions(),
            model: self.encoder.model_name().to_string(),
        })
    }
}

impl fmt::Debug for KnowledgeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnowledgeContext")
            .field("encoder", &self.encoder)
            .field("collection", &self.index.collection())
            .finish()
    }
}

/// Build state of a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Indexing,
    Ready,
}

/// Retrieval-augmented question answering over one collection.
#[derive(Debug)]
pub struct Pipeline {
    context: KnowledgeContext,
    corpus_path: PathBuf,
    top_k: usize,
    progress: ProgressReporter,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(context: KnowledgeContext, corpus_path: impl Into<PathBuf>) -> Self {
        Self {
            context,
            corpus_path: corpus_path.into(),
            top_k: DEFAULT_TOP_K,
            progress: ProgressReporter::noop(),
            state: PipelineState::Uninitialized,
        }
    }

    /// Pipeline over the configured corpus, collection and generator.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let context = KnowledgeContext::from_config(config).await?;
        Ok(Self::new(context, config.corpus_path()).with_top_k(config.retrieval.top_k))
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn context(&self) -> &KnowledgeContext {
        &self.context
    }

    pub fn corpus_path(&self) -> &Path {
        &self.corpus_path
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Make sure the index is populated, building it from the corpus if empty.
    ///
    /// A failed build leaves the pipeline `Uninitialized` and returns the error.
    pub async fn initialize(&mut self) -> AppResult<BuildStats> {
        if self.state == PipelineState::Ready {
            return Ok(BuildStats {
                documents: 0,
                entries_added: 0,
                total_entries: self.context.index.count().await?,
                skipped: true,
                duration_secs: 0.0,
            });
        }

        self.run_build().await
    }

    /// Replace the collection with a fresh build of the corpus.
    ///
    /// The collection is cleared only once the new entries are ready; a
    /// failed rebuild keeps the previous entries.
    pub async fn rebuild(&mut self) -> AppResult<BuildStats> {
        let previous = self.state;
        self.state = PipelineState::Indexing;

        let result = rebuild_index(
            &self.corpus_path,
            &self.context.encoder,
            self.context.index.as_ref(),
            &self.progress,
        )
        .await;

        match result {
            Ok(stats) => {
                self.state = PipelineState::Ready;
                Ok(stats)
            }
            Err(e) => {
                tracing::error!(error = %e, corpus = ?self.corpus_path, "Index rebuild failed");
                self.state = previous;
                Err(e)
            }
        }
    }

    async fn run_build(&mut self) -> AppResult<BuildStats> {
        self.state = PipelineState::Indexing;

        let result = build_index(
            &self.corpus_path,
            &self.context.encoder,
            self.context.index.as_ref(),
            &self.progress,
        )
        .await;

        match result {
            Ok(stats) => {
                self.state = PipelineState::Ready;
                Ok(stats)
            }
            Err(e) => {
                tracing::error!(error = %e, corpus = ?self.corpus_path, "Index build failed");
                self.state = PipelineState::Uninitialized;
                Err(e)
            }
        }
    }

    /// Answer `question` from the `top_k` closest passages.
    ///
    /// Initialises the index on first use. Generation failures do not error:
    /// the response carries the fallback answer and `degraded` is set.
    ///
    /// # Errors
    /// * `Input` for a blank question
    /// * `EmptyIndex` when the collection has no entries
    /// * build errors when the first-use build fails
    pub async fn ask(&mut self, question: &str) -> AppResult<RagResponse> {
        if question.trim().is_empty() {
            return Err(AppError::Input("Question must not be empty".to_string()));
        }

        if self.state != PipelineState::Ready {
            self.initialize().await?;
        }

        let retrieval = self
            .context
            .retriever()
            .retrieve(question, self.top_k)
            .await?;

        let answer = self
            .context
            .generator
            .generate(question, &retrieval.texts)
            .await;

        let response = RagResponse::new(answer, retrieval.sources());
        if response.degraded {
            tracing::warn!("Answer generated in degraded mode");
        }

        Ok(response)
    }

    pub async fn stats(&self) -> AppResult<IndexStats> {
        self.context.stats().await
    }
}
