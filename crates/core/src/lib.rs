//! MedRAG Core Library
//!
//! This crate provides the foundational utilities shared by every MedRAG crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Layered configuration (defaults, YAML file, environment, CLI)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, DistanceMetric};
pub use error::{AppError, AppResult};
