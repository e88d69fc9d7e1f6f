//! Configuration management for MedRAG.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Compiled defaults
//! - Config file (`.medrag/config.yaml` under the workspace)
//! - Environment variables
//! - Command-line flags
//!
//! Relative paths in the configuration are resolved against the workspace root.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Generation providers the LLM factory knows how to build.
pub const GENERATION_PROVIDERS: [&str; 2] = ["gemini", "ollama"];

/// Embedding providers the knowledge crate knows how to build.
pub const EMBEDDING_PROVIDERS: [&str; 3] = ["trigram", "ollama", "minilm"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .medrag/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Ingestion corpus settings
    pub corpus: CorpusConfig,

    /// Vector store settings
    pub index: IndexConfig,

    /// Embedding encoder settings
    pub embedding: EmbeddingConfig,

    /// Generative model settings
    pub generation: GenerationConfig,

    /// Retrieval settings
    pub retrieval: RetrievalConfig,

    /// Article collector settings
    pub collector: CollectorConfig,

    /// Explicit API key (MEDRAG_API_KEY); never read from the config file
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Distance metric used by a vector collection.
///
/// The metric is fixed when a collection is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cosine_similarity`
    #[default]
    Cosine,
    /// Euclidean distance
    L2,
}

impl DistanceMetric {
    /// Parse a metric name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Some(Self::Cosine),
            "l2" | "euclidean" => Some(Self::L2),
            _ => None,
        }
    }

    /// Canonical metric name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::L2 => "l2",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line-delimited JSON corpus used to build the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CorpusConfig {
    pub path: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/raw/medical_data.jsonl"),
        }
    }
}

/// Persistent vector store location and collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexConfig {
    /// Store root directory
    pub path: PathBuf,

    /// Collection (table) name inside the store
    pub collection: String,

    /// Distance metric for new collections
    pub metric: DistanceMetric,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("vector_db"),
            collection: "medical_kb".to_string(),
            metric: DistanceMetric::Cosine,
        }
    }
}

/// Embedding encoder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingConfig {
    /// Provider name: "trigram", "ollama", "minilm"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Number of texts encoded per provider call during indexing
    pub batch_size: usize,

    /// HTTP endpoint for remote providers (ollama)
    pub endpoint: Option<String>,

    /// Local model directory (minilm: config.json, tokenizer.json, model.safetensors)
    pub model_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            batch_size: 32,
            endpoint: None,
            model_dir: None,
        }
    }
}

/// Generative model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Provider name: "gemini" or "ollama"
    pub provider: String,

    /// Base URL of the generation API
    pub endpoint: String,

    /// Model identifier
    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Nucleus sampling threshold
    pub top_p: f32,

    /// Maximum generated tokens
    pub max_output_tokens: u32,

    /// Upper bound for one generation call, in seconds
    pub timeout_secs: u64,

    /// Language the answer should be written in
    pub language: String,

    /// Optional Handlebars template replacing the built-in prompt.
    /// Variables: `context`, `question`, `language`.
    pub prompt_template: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            temperature: 0.2,
            top_p: 0.95,
            max_output_tokens: 300,
            timeout_secs: 10,
            language: "English".to_string(),
            prompt_template: None,
        }
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalConfig {
    /// Number of passages handed to the generator
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Literature collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CollectorConfig {
    /// Search endpoint (Europe PMC REST search)
    pub endpoint: String,

    /// Topic queries, one fetch per topic
    pub topics: Vec<String>,

    /// Results requested per topic
    pub max_results: u32,

    /// Attempts per topic before moving on
    pub retry_limit: u32,

    /// Fixed delay between attempts, in seconds
    pub retry_delay_secs: u64,

    /// Request timeout, in seconds
    pub timeout_secs: u64,

    /// JSONL output path
    pub output: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.ebi.ac.uk/europepmc/webservices/rest/search".to_string(),
            topics: vec![
                "diabetes treatment".to_string(),
                "hypertension management".to_string(),
                "mental health therapy".to_string(),
                "cardiovascular diseases".to_string(),
                "infectious diseases".to_string(),
            ],
            max_results: 10,
            retry_limit: 3,
            retry_delay_secs: 5,
            timeout_secs: 30,
            output: PathBuf::from("data/raw/medical_data_for_rag.jsonl"),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    corpus: Option<CorpusConfig>,
    index: Option<IndexConfig>,
    embedding: Option<EmbeddingConfig>,
    generation: Option<GenerationConfig>,
    retrieval: Option<RetrievalConfig>,
    collector: Option<CollectorConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            corpus: CorpusConfig::default(),
            index: IndexConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            retrieval: RetrievalConfig::default(),
            collector: CollectorConfig::default(),
            api_key: None,
            log_level: None,
            log_json: false,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and environment variables.
    ///
    /// `workspace` and `config_file` come from the command line when given;
    /// otherwise `MEDRAG_WORKSPACE` / `MEDRAG_CONFIG` are consulted.
    ///
    /// Environment variables:
    /// - `MEDRAG_WORKSPACE`: Override workspace path
    /// - `MEDRAG_CONFIG`: Path to config file
    /// - `MEDRAG_CORPUS`: Corpus JSONL path
    /// - `MEDRAG_INDEX_PATH`: Vector store directory
    /// - `MEDRAG_COLLECTION`: Collection name
    /// - `MEDRAG_GENERATION_PROVIDER`: Generation provider
    /// - `MEDRAG_GENERATION_ENDPOINT`: Generation endpoint URL
    /// - `MEDRAG_GENERATION_MODEL`: Generation model
    /// - `MEDRAG_API_KEY`: API key (takes precedence over `generation.apiKeyEnv`)
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use medrag_core::config::AppConfig;
    ///
    /// let config = AppConfig::load(None, None).expect("Failed to load config");
    /// println!("Corpus: {:?}", config.corpus_path());
    /// ```
    pub fn load(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("MEDRAG_WORKSPACE")) {
            config.workspace = workspace;
        }
        config.config_file = config_file.or_else(|| env_path("MEDRAG_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => config.resolve_path(cf),
            None => config.medrag_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        config.apply_env(|key| std::env::var(key).ok());

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &Path) -> AppResult<()> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        tracing::debug!("Merged config file {:?}", path);
        Ok(())
    }

    /// Merge YAML configuration text into this config.
    pub fn merge_yaml_str(&mut self, contents: &str) -> AppResult<()> {
        let file: ConfigFile = serde_yaml::from_str(contents)?;

        if let Some(path) = file.workspace.and_then(|ws| ws.path) {
            self.workspace = PathBuf::from(path);
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
            if let Some(json) = logging.json {
                self.log_json = json;
            }
        }

        if let Some(corpus) = file.corpus {
            self.corpus = corpus;
        }
        if let Some(index) = file.index {
            self.index = index;
        }
        if let Some(embedding) = file.embedding {
            self.embedding = embedding;
        }
        if let Some(generation) = file.generation {
            self.generation = generation;
        }
        if let Some(retrieval) = file.retrieval {
            self.retrieval = retrieval;
        }
        if let Some(collector) = file.collector {
            self.collector = collector;
        }

        Ok(())
    }

    /// Apply environment overrides using the given variable lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(corpus) = lookup("MEDRAG_CORPUS") {
            self.corpus.path = PathBuf::from(corpus);
        }
        if let Some(index_path) = lookup("MEDRAG_INDEX_PATH") {
            self.index.path = PathBuf::from(index_path);
        }
        if let Some(collection) = lookup("MEDRAG_COLLECTION") {
            self.index.collection = collection;
        }
        if let Some(provider) = lookup("MEDRAG_GENERATION_PROVIDER") {
            self.generation.provider = provider;
        }
        if let Some(endpoint) = lookup("MEDRAG_GENERATION_ENDPOINT") {
            self.generation.endpoint = endpoint;
        }
        if let Some(model) = lookup("MEDRAG_GENERATION_MODEL") {
            self.generation.model = model;
        }

        self.api_key = lookup("MEDRAG_API_KEY");

        if let Some(level) = lookup("RUST_LOG") {
            self.log_level = Some(level);
        }
        if lookup("NO_COLOR").is_some() {
            self.no_color = true;
        }
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and
    /// the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        corpus: Option<PathBuf>,
        collection: Option<String>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(corpus) = corpus {
            self.corpus.path = corpus;
        }

        if let Some(collection) = collection {
            self.index.collection = collection;
        }

        if let Some(provider) = provider {
            self.generation.provider = provider;
        }

        if let Some(model) = model {
            self.generation.model = model;
        }

        if verbose {
            self.verbose = true;
            // Verbose wins over RUST_LOG and the config file
            self.log_level = Some("debug".to_string());
        }

        // An explicit --log-level wins over --verbose
        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .medrag directory.
    pub fn medrag_dir(&self) -> PathBuf {
        self.workspace.join(".medrag")
    }

    /// Resolve a possibly relative path against the workspace root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Absolute path of the ingestion corpus.
    pub fn corpus_path(&self) -> PathBuf {
        self.resolve_path(&self.corpus.path)
    }

    /// Absolute path of the vector store root.
    pub fn index_path(&self) -> PathBuf {
        self.resolve_path(&self.index.path)
    }

    /// Absolute path of the collector output file.
    pub fn collector_output_path(&self) -> PathBuf {
        self.resolve_path(&self.collector.output)
    }

    /// Absolute path of the local encoder model directory, if configured.
    pub fn embedding_model_dir(&self) -> Option<PathBuf> {
        self.embedding
            .model_dir
            .as_ref()
            .map(|dir| self.resolve_path(dir))
    }

    /// Resolve the generation API key.
    ///
    /// `MEDRAG_API_KEY` wins; otherwise the variable named by
    /// `generation.apiKeyEnv` is read.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        std::env::var(&self.generation.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.generation.provider.as_str();
        if !GENERATION_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown generation provider: {}. Supported: {}",
                provider,
                GENERATION_PROVIDERS.join(", ")
            )));
        }

        let embedding = self.embedding.provider.as_str();
        if !EMBEDDING_PROVIDERS.contains(&embedding) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                embedding,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be greater than zero".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "embedding.batchSize must be greater than zero".to_string(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config(
                "retrieval.topK must be at least 1".to_string(),
            ));
        }

        if self.index.collection.trim().is_empty() {
            return Err(AppError::Config(
                "index.collection must not be empty".to_string(),
            ));
        }

        let generation = &self.generation;
        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(AppError::Config(format!(
                "generation.temperature must be within 0.0-2.0, got {}",
                generation.temperature
            )));
        }
        if !(generation.top_p > 0.0 && generation.top_p <= 1.0) {
            return Err(AppError::Config(format!(
                "generation.topP must be within (0.0, 1.0], got {}",
                generation.top_p
            )));
        }
        if generation.timeout_secs == 0 {
            return Err(AppError::Config(
                "generation.timeoutSecs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.generation.provider, "gemini");
        assert_eq!(config.generation.model, "gemini-1.5-flash");
        assert_eq!(config.generation.timeout_secs, 10);
        assert_eq!(config.generation.max_output_tokens, 300);
        assert_eq!(config.index.collection, "medical_kb");
        assert_eq!(config.index.metric, DistanceMetric::Cosine);
        assert_eq!(config.retrieval.top_k, 3);
        assert!(!config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_yaml_sections() {
        let mut config = AppConfig::default();
        config
            .merge_yaml_str(
                r#"
index:
  path: store
  collection: cardiology
  metric: l2
generation:
  provider: ollama
  endpoint: http://localhost:11434
  model: llama3.2
  temperature: 0.5
logging:
  level: warn
  color: false
"#,
            )
            .unwrap();

        assert_eq!(config.index.collection, "cardiology");
        assert_eq!(config.index.metric, DistanceMetric::L2);
        assert_eq!(config.generation.provider, "ollama");
        assert_eq!(config.generation.temperature, 0.5);
        // Unspecified fields keep their defaults
        assert_eq!(config.generation.top_p, 0.95);
        assert_eq!(config.corpus.path, PathBuf::from("data/raw/medical_data.jsonl"));
        assert_eq!(config.log_level.as_deref(), Some("warn"));
        assert!(config.no_color);
    }

    #[test]
    fn test_load_reads_workspace_config_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join(".medrag");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("config.yaml"),
            "retrieval:\n  topK: 5\ncorpus:\n  path: corpus.jsonl\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(temp.path().to_path_buf()), None).unwrap();
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.corpus_path(), temp.path().join("corpus.jsonl"));
    }

    #[test]
    fn test_load_missing_explicit_config_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let result = AppConfig::load(
            Some(temp.path().to_path_buf()),
            Some(PathBuf::from("missing.yaml")),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_apply_env() {
        let vars: HashMap<&str, &str> = [
            ("MEDRAG_COLLECTION", "neurology"),
            ("MEDRAG_GENERATION_ENDPOINT", "http://127.0.0.1:8080"),
            ("MEDRAG_API_KEY", "secret"),
            ("NO_COLOR", "1"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.index.collection, "neurology");
        assert_eq!(config.generation.endpoint, "http://127.0.0.1:8080");
        assert_eq!(config.resolve_api_key().as_deref(), Some("secret"));
        assert!(config.no_color);
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            Some(PathBuf::from("other.jsonl")),
            None,
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.corpus.path, PathBuf::from("other.jsonl"));
        assert_eq!(overridden.generation.provider, "ollama");
        assert_eq!(overridden.generation.model, "llama3.2");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_verbose_overrides_env_log_level() {
        let mut config = AppConfig::default();
        config.apply_env(|key| (key == "RUST_LOG").then(|| "warn".to_string()));
        assert_eq!(config.log_level.as_deref(), Some("warn"));

        let verbose = config
            .clone()
            .with_overrides(None, None, None, None, None, true, false);
        assert_eq!(verbose.log_level.as_deref(), Some("debug"));

        let explicit = config.with_overrides(
            None,
            None,
            None,
            None,
            Some("trace".to_string()),
            true,
            false,
        );
        assert_eq!(explicit.log_level.as_deref(), Some("trace"));
    }

    #[test]
    fn test_resolve_path() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/srv/medrag");
        assert_eq!(
            config.index_path(),
            PathBuf::from("/srv/medrag/vector_db")
        );
        assert_eq!(
            config.resolve_path(Path::new("/abs/corpus.jsonl")),
            PathBuf::from("/abs/corpus.jsonl")
        );
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.generation.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_top_k() {
        let mut config = AppConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_top_p_range() {
        let mut config = AppConfig::default();
        config.generation.top_p = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_metric_parse() {
        assert_eq!(DistanceMetric::parse("cosine"), Some(DistanceMetric::Cosine));
        assert_eq!(DistanceMetric::parse("L2"), Some(DistanceMetric::L2));
        assert_eq!(DistanceMetric::parse("dot"), None);
        assert_eq!(DistanceMetric::L2.to_string(), "l2");
    }
}
