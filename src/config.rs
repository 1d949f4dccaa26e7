//! TOML configuration.
//!
//! Every tunable that the pipelines need (roots to index, example count,
//! model names, timeouts, the system prompt) lives here and is passed down
//! explicitly. Only `[index]` is required; the other sections fall back to
//! defaults that target a local Chroma and Ollama.
//!
//! ```toml
//! [index]
//! roots = ["./src"]
//! extensions = ["go", "rs"]
//! exclude = ["vendor/", "**/*_test.go"]
//! concurrency = 8
//!
//! [retrieval]
//! examples = 3
//! timeout_secs = 30
//!
//! [store]
//! url = "http://localhost:8000"
//! collection = "code_snippets"
//!
//! [embedding]
//! model = "nomic-embed-text"
//!
//! [llm]
//! model = "qwen2.5-coder:7b"
//! temperature = 0.2
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use code_companion_core::prompt::DEFAULT_SYSTEM_PROMPT;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    pub roots: Vec<PathBuf>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Path fragments (`vendor/`) or globs (`**/*_test.go`) to skip.
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Maximum number of files processed at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_extensions() -> Vec<String> {
    vec!["go".to_string()]
}
fn default_concurrency() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of examples retrieved per question.
    #[serde(default = "default_examples")]
    pub examples: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            examples: default_examples(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_examples() -> usize {
    3
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_url")]
    pub url: String,
    #[serde(default = "default_tenant")]
    pub tenant: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            tenant: default_tenant(),
            database: default_database(),
            collection: default_collection(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_store_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_tenant() -> String {
    "default_tenant".to_string()
}
fn default_database() -> String {
    "default_database".to_string()
}
fn default_collection() -> String {
    "code_snippets".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            url: default_ollama_url(),
            model: default_embedding_model(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_batch_size() -> usize {
    32
}
fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Upper bound on generated tokens.
    #[serde(default = "default_num_predict")]
    pub num_predict: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_llm_model(),
            temperature: default_temperature(),
            num_predict: default_num_predict(),
            timeout_secs: default_llm_timeout_secs(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_llm_model() -> String {
    "qwen2.5-coder:7b".to_string()
}
fn default_temperature() -> f64 {
    0.2
}
fn default_num_predict() -> u32 {
    2048
}
fn default_llm_timeout_secs() -> u64 {
    120
}
fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content).with_context(|| format!("Invalid config file: {}", path.display()))
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config file")?;

    if config.index.roots.is_empty() {
        bail!("index.roots must list at least one directory");
    }
    if config.index.extensions.is_empty() {
        bail!("index.extensions must list at least one extension");
    }
    if config.index.concurrency == 0 {
        bail!("index.concurrency must be >= 1");
    }

    if config.retrieval.examples == 0 {
        bail!("retrieval.examples must be >= 1");
    }
    if config.retrieval.timeout_secs == 0 {
        bail!("retrieval.timeout_secs must be >= 1");
    }

    if !(0.0..=2.0).contains(&config.llm.temperature) {
        bail!("llm.temperature must be in [0.0, 2.0]");
    }

    match config.embedding.provider.as_str() {
        "ollama" => {}
        other => bail!("Unknown embedding provider: '{}'. Must be ollama.", other),
    }
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be >= 1");
    }

    Ok(config)
}
