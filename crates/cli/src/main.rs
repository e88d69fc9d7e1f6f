//! MedRAG CLI
//!
//! Main entry point for the medrag command-line tool.
//! Answers medical questions from a local knowledge base with cited sources.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, CollectCommand, IndexCommand, StatsCommand};
use medrag_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// MedRAG - medical question answering over a local knowledge base
#[derive(Parser, Debug)]
#[command(name = "medrag")]
#[command(about = "Medical question answering with retrieval-augmented generation", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "MEDRAG_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file (default: .medrag/config.yaml)
    #[arg(short, long, global = true, env = "MEDRAG_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); overrides RUST_LOG and --verbose
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Generation provider (gemini, ollama)
    #[arg(short, long, global = true, env = "MEDRAG_GENERATION_PROVIDER")]
    provider: Option<String>,

    /// Generation model identifier
    #[arg(short, long, global = true, env = "MEDRAG_GENERATION_MODEL")]
    model: Option<String>,

    /// Corpus file (JSONL)
    #[arg(long, global = true, env = "MEDRAG_CORPUS")]
    corpus: Option<PathBuf>,

    /// Collection name inside the vector store
    #[arg(long, global = true, env = "MEDRAG_COLLECTION")]
    collection: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask one question
    Ask(AskCommand),

    /// Interactive question session
    Chat(ChatCommand),

    /// Build or rebuild the vector index
    Index(IndexCommand),

    /// Fetch article abstracts into a corpus file
    Collect(CollectCommand),

    /// Show collection statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load(cli.workspace, cli.config)?;

    let mut config = config.with_overrides(
        cli.corpus,
        cli.collection,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );
    if cli.log_json {
        config.log_json = true;
    }

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    tracing::info!("MedRAG CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!(
        "Generation: {} / {}",
        config.generation.provider,
        config.generation.model
    );
    tracing::debug!(
        "Embedding: {} / {}",
        config.embedding.provider,
        config.embedding.model
    );

    config.validate()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Index(_) => "index",
        Commands::Collect(_) => "collect",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Index(cmd) => cmd.execute(&config).await,
        Commands::Collect(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
