//! Collect command handler.
//!
//! Fetches article abstracts per topic and writes a corpus file.

use super::print_json;
use clap::Args;
use medrag_core::{config::AppConfig, AppResult};
use medrag_knowledge::ArticleCollector;
use std::path::PathBuf;

/// Fetch article abstracts into a corpus file
#[derive(Args, Debug)]
pub struct CollectCommand {
    /// Output JSONL file (default: collector.output)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Topic query; repeat for several (default: collector.topics)
    #[arg(short, long)]
    pub topic: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CollectCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing collect command");

        let topics = if self.topic.is_empty() {
            config.collector.topics.clone()
        } else {
            self.topic.clone()
        };
        let output = match &self.output {
            Some(path) => config.resolve_path(path),
            None => config.collector_output_path(),
        };

        let collector = ArticleCollector::new(&config.collector)?;
        let report = collector.collect(&topics, &output).await?;

        if self.json {
            print_json(&serde_json::json!({
                "articles": report.articles,
                "succeededTopics": report.succeeded_topics,
                "failedTopics": report.failed_topics,
                "output": report.output,
            }))?;
            return Ok(());
        }

        match &report.output {
            Some(path) => println!("Saved {} articles to {}", report.articles, path.display()),
            None => println!("No articles collected"),
        }
        for topic in &report.failed_topics {
            println!("  failed: {}", topic);
        }

        Ok(())
    }
}
