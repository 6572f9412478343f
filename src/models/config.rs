use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

pub const DEFAULT_EMBEDDING_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-exp-03-07";
pub const DEFAULT_LOCAL_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";
pub const DEFAULT_GENERATION_API_BASE: &str = "https://api.mistral.ai/v1";
pub const DEFAULT_GENERATION_MODEL: &str = "mistral-small";
pub const DEFAULT_COLLECTION: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub embedder: EmbedderConfig,

    #[serde(default)]
    pub searchbot: SearchbotConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("docqa").join("config.toml"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            return Ok(config);
        }
        Ok(Self::default())
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::Path("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Reject chunking parameters the pipeline cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding.chunk_size == 0 {
            return Err(ConfigError::Validation(
                "embedding.chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.embedding.chunk_overlap >= self.embedding.chunk_size {
            return Err(ConfigError::Validation(format!(
                "embedding.chunk_overlap ({}) must be smaller than embedding.chunk_size ({})",
                self.embedding.chunk_overlap, self.embedding.chunk_size
            )));
        }
        Ok(())
    }
}

/// Embedding provider configuration.
///
/// API keys are sourced from the process environment only and are never
/// persisted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model_name: String,

    #[serde(default = "default_embedding_api_base")]
    pub api_base: String,

    /// Vector dimension produced by the remote model.
    #[serde(default = "default_dimension")]
    pub dimension: u32,

    #[serde(default = "default_use_local_fallback")]
    pub use_local_fallback: bool,

    /// Name of (or path to) the local fallback model directory.
    #[serde(default = "default_local_embedding_model")]
    pub local_embedding_model: String,

    /// Vector dimension produced by the local fallback model.
    #[serde(default = "default_local_dimension")]
    pub local_dimension: u32,

    /// Chunk window size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Overlap between consecutive chunks in characters.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,

    /// Number of chunks embedded per provider call.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Upper bound on embedding batches in flight during indexing.
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: u32,

    /// Token budget for the local tokenizer.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_embedding_api_base() -> String {
    DEFAULT_EMBEDDING_API_BASE.to_string()
}

fn default_dimension() -> u32 {
    3072
}

fn default_use_local_fallback() -> bool {
    true
}

fn default_local_embedding_model() -> String {
    DEFAULT_LOCAL_EMBEDDING_MODEL.to_string()
}

fn default_local_dimension() -> u32 {
    384
}

fn default_chunk_size() -> u32 {
    512
}

fn default_chunk_overlap() -> u32 {
    50
}

fn default_batch_size() -> u32 {
    8
}

fn default_timeout() -> u64 {
    120
}

fn default_max_concurrent_batches() -> u32 {
    4
}

fn default_max_tokens() -> u32 {
    512
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: default_embedding_model(),
            api_base: default_embedding_api_base(),
            dimension: default_dimension(),
            use_local_fallback: default_use_local_fallback(),
            local_embedding_model: default_local_embedding_model(),
            local_dimension: default_local_dimension(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout(),
            max_concurrent_batches: default_max_concurrent_batches(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Vector store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderConfig {
    /// Root directory holding one subdirectory per collection.
    #[serde(default = "default_vector_db_path")]
    pub vector_db_path: PathBuf,
}

fn default_vector_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docqa")
        .join("index")
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            vector_db_path: default_vector_db_path(),
        }
    }
}

/// Retrieval and answer-generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchbotConfig {
    /// Default number of candidates retrieved per query.
    #[serde(default = "default_result_limit")]
    pub result_limit: u32,

    /// Character budget for the assembled context.
    #[serde(default = "default_max_context_length")]
    pub max_context_length: u32,

    #[serde(default = "default_generation_model")]
    pub model_name: String,

    #[serde(default = "default_generation_api_base")]
    pub api_base: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_generation_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_result_limit() -> u32 {
    5
}

fn default_max_context_length() -> u32 {
    4000
}

fn default_generation_model() -> String {
    DEFAULT_GENERATION_MODEL.to_string()
}

fn default_generation_api_base() -> String {
    DEFAULT_GENERATION_API_BASE.to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_generation_max_tokens() -> u32 {
    10000
}

impl Default for SearchbotConfig {
    fn default() -> Self {
        Self {
            result_limit: default_result_limit(),
            max_context_length: default_max_context_length(),
            model_name: default_generation_model(),
            api_base: default_generation_api_base(),
            temperature: default_temperature(),
            max_tokens: default_generation_max_tokens(),
            timeout_secs: default_timeout(),
        }
    }
}
