//! Embedding provider implementations.

pub mod ollama;
pub mod trigram;

#[cfg(feature = "local-model")]
pub mod minilm;
