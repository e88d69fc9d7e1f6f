//! Chat command handler.
//!
//! Reads questions from stdin until an exit word or end of input.

use super::{print_answer, stderr_progress};
use clap::Args;
use medrag_core::{config::AppConfig, AppError, AppResult};
use medrag_knowledge::Pipeline;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Words that end the session.
const EXIT_WORDS: [&str; 3] = ["exit", "quit", "quitter"];

/// Interactive question session
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Number of passages handed to the model
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,
}

fn is_exit(line: &str) -> bool {
    let word = line.trim().to_lowercase();
    EXIT_WORDS.contains(&word.as_str())
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Starting chat session");

        let top_k = self.top_k.unwrap_or(config.retrieval.top_k);
        let mut pipeline = Pipeline::from_config(config)
            .await?
            .with_top_k(top_k)
            .with_progress(stderr_progress());

        // Build up front so the first question is not slowed down
        pipeline.initialize().await?;

        println!("Ask a medical question ({} to leave).", EXIT_WORDS.join("/"));

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            if is_exit(&line) {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }

            match pipeline.ask(line.trim()).await {
                Ok(response) => {
                    print_answer(&response.answer, &response.sources);
                    println!();
                }
                Err(AppError::EmptyIndex(collection)) => {
                    eprintln!(
                        "Collection '{}' is empty. Add documents to the corpus and run 'medrag index --rebuild'.",
                        collection
                    );
                }
                Err(e) => eprintln!("Error: {}", e),
            }
        }

        tracing::info!("Chat session ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_words() {
        assert!(is_exit("exit"));
        assert!(is_exit("  QUIT "));
        assert!(is_exit("quitter"));
        assert!(!is_exit("what is diabetes?"));
        assert!(!is_exit(""));
    }
}
