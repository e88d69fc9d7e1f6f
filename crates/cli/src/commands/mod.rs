//! Command handlers for the MedRAG CLI.

pub mod ask;
pub mod chat;
pub mod collect;
pub mod index;
pub mod stats;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use collect::CollectCommand;
pub use index::IndexCommand;
pub use stats::StatsCommand;

use medrag_core::{AppError, AppResult};
use medrag_knowledge::ProgressReporter;
use std::sync::Arc;

/// Build progress printed to stderr, keeping stdout for results.
pub(crate) fn stderr_progress() -> ProgressReporter {
    ProgressReporter::new(Arc::new(|event| eprintln!("{}", event.format_simple())))
}

pub(crate) fn print_json(value: &serde_json::Value) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Serialization(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

/// Print an answer followed by its numbered sources.
pub(crate) fn print_answer(answer: &str, sources: &[String]) {
    println!("{}", answer);
    if !sources.is_empty() {
        println!();
        println!("Sources:");
        for (i, source) in sources.iter().enumerate() {
            println!("  {}. {}", i + 1, source);
        }
    }
}
