//! Medical knowledge base and retrieval-augmented answering.
//!
//! Loads a JSONL corpus of medical documents, encodes it into a persistent
//! LanceDB collection, retrieves the passages closest to a question and asks
//! a generative model to answer from them.
//!
//! # Example
//! ```no_run
//! use medrag_core::AppConfig;
//! use medrag_knowledge::Pipeline;
//!
//! # async fn example() -> medrag_core::AppResult<()> {
//! let config = AppConfig::load(None, None)?;
//! let mut pipeline = Pipeline::from_config(&config).await?;
//!
//! let (answer, sources) = pipeline
//!     .ask("What are symptoms of high blood sugar?")
//!     .await?
//!     .into_parts();
//! println!("{}\n{:?}", answer, sources);
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod distance;
pub mod embeddings;
pub mod ingest;
pub mod lancedb_index;
pub mod loader;
pub mod memory_index;
pub mod pipeline;
pub mod progress;
pub mod rag;
pub mod retriever;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use collector::{ArticleCollector, CollectReport, RetryPolicy};
pub use embeddings::{EmbeddingProvider, Encoder};
pub use ingest::{build_index, prepare_entries, rebuild_index};
pub use lancedb_index::LanceDbIndex;
pub use loader::{load_documents, save_jsonl};
pub use memory_index::InMemoryIndex;
pub use pipeline::{open_index, KnowledgeContext, Pipeline, PipelineState};
pub use progress::{ProgressEvent, ProgressReporter};
pub use rag::{AnswerGenerator, RagResponse};
pub use retriever::Retriever;
pub use types::{BuildStats, Document, EntryMetadata, IndexEntry, IndexStats, QueryHit, Retrieval};
pub use vector_index::VectorIndex;
