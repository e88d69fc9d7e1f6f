//! Index command handler.
//!
//! Builds the vector index from the corpus, or rebuilds it from scratch.
//! No generation client is needed.

use super::{print_json, stderr_progress};
use clap::Args;
use medrag_core::{config::AppConfig, AppResult};
use medrag_knowledge::{
    build_index, open_index, rebuild_index, Encoder, ProgressReporter, VectorIndex,
};

/// Build or rebuild the vector index
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Clear the collection and index the corpus again
    #[arg(long)]
    pub rebuild: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!(rebuild = self.rebuild, "Executing index command");

        let model_dir = config.embedding_model_dir();
        let encoder = Encoder::from_config(&config.embedding, model_dir.as_deref()).await?;
        let index = open_index(config, &encoder).await?;

        let corpus = config.corpus_path();
        let progress = if self.json {
            ProgressReporter::noop()
        } else {
            stderr_progress()
        };
        let stats = if self.rebuild {
            rebuild_index(&corpus, &encoder, index.as_ref(), &progress).await?
        } else {
            build_index(&corpus, &encoder, index.as_ref(), &progress).await?
        };

        if self.json {
            print_json(&serde_json::json!({
                "collection": index.collection(),
                "corpus": corpus,
                "documents": stats.documents,
                "entriesAdded": stats.entries_added,
                "totalEntries": stats.total_entries,
                "skipped": stats.skipped,
                "durationSecs": stats.duration_secs,
            }))?;
        } else if stats.skipped {
            println!(
                "Collection '{}' already holds {} entries; use --rebuild to index again",
                index.collection(),
                stats.total_entries
            );
        } else {
            println!(
                "Indexed {} documents into '{}' ({} entries) in {:.2}s",
                stats.documents,
                index.collection(),
                stats.total_entries,
                stats.duration_secs
            );
        }

        Ok(())
    }
}
