//! Ask command handler.
//!
//! Answers a single question from the knowledge base.

use super::{print_answer, print_json, stderr_progress};
use clap::Args;
use medrag_core::{config::AppConfig, AppResult};
use medrag_knowledge::Pipeline;

/// Ask one question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Number of passages handed to the model
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let top_k = self.top_k.unwrap_or(config.retrieval.top_k);
        let mut pipeline = Pipeline::from_config(config)
            .await?
            .with_top_k(top_k)
            .with_progress(stderr_progress());

        let response = pipeline.ask(&self.question).await?;

        if self.json {
            print_json(&serde_json::json!({
                "question": self.question,
                "answer": response.answer,
                "sources": response.sources,
                "degraded": response.degraded,
                "provider": config.generation.provider,
                "model": config.generation.model,
            }))?;
        } else {
            print_answer(&response.answer, &response.sources);
        }

        Ok(())
    }
}
