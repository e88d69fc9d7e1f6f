//! Retrieval-augmented answering.
//!
//! Prompt construction, answer generation with a fallback policy, and the
//! response type handed back to callers.

pub mod generator;
pub mod prompt;
pub mod types;

pub use generator::{fallback_answer, is_fallback, AnswerGenerator, GenerationSettings, FALLBACK_MARKER};
pub use prompt::{PromptTemplate, DEFAULT_PROMPT_TEMPLATE};
pub use types::RagResponse;
