//! Stats command handler.
//!
//! Shows the collection name, entry count, metric and encoder of the
//! persisted index.

use super::print_json;
use clap::Args;
use medrag_core::{config::AppConfig, AppResult};
use medrag_knowledge::{IndexStats, LanceDbIndex, VectorIndex};

/// Show collection statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let index = LanceDbIndex::open_existing(&config.index_path(), &config.index.collection).await?;
        let stats = IndexStats {
            collection: index.collection().to_string(),
            entries: index.count().await?,
            metric: index.metric().as_str().to_string(),
            dimensions: index.dimensions(),
            model: index.manifest().model.clone(),
        };

        if self.json {
            print_json(&serde_json::json!({
                "collection": stats.collection,
                "entries": stats.entries,
                "metric": stats.metric,
                "dimensions": stats.dimensions,
                "model": stats.model,
                "createdAt": index.manifest().created_at,
            }))?;
        } else {
            println!("Collection:  {}", stats.collection);
            println!("Entries:     {}", stats.entries);
            println!("Metric:      {}", stats.metric);
            println!("Dimensions:  {}", stats.dimensions);
            println!("Encoder:     {}", stats.model);
        }

        Ok(())
    }
}
