//! Error types for MedRAG.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! model providers, and the retrieval pipeline (ingestion, indexing,
//! retrieval and generation).

use thiserror::Error;

/// Unified error type for MedRAG.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic: errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors (transport, protocol)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Vector store and embedding errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Malformed ingestion input or invalid call arguments
    #[error("Input error: {0}")]
    Input(String),

    /// A required file or store does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// An entry id is already present in the index
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    /// A query was issued against a collection with no entries
    #[error("Empty index: collection '{0}' has no entries")]
    EmptyIndex(String),

    /// The generative model failed (network, timeout, bad response)
    #[error("Generation error: {0}")]
    Generation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
