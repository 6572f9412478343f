//! Error types for the document QA pipeline.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors from the chunking stage.
#[derive(Debug, Error)]
pub enum ChunkerError {
    #[error("invalid chunking configuration: {0}")]
    InvalidConfiguration(String),
}

/// Errors from embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding authentication failed: {0}")]
    Authentication(String),

    #[error("failed to reach embedding endpoint: {0}")]
    Connection(String),

    #[error("embedding endpoint returned status {status}: {body}")]
    Server { status: u16, body: String },

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding request timed out")]
    Timeout,

    #[error("embedding model error: {0}")]
    Model(String),

    #[error("all embedding providers exhausted after {attempts} attempts: {last_error}")]
    Unavailable { attempts: u32, last_error: String },
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::Connection(_) | EmbeddingError::Timeout => true,
            // Rate limiting and server-side failures may clear up
            EmbeddingError::Server { status, .. } => *status == 429 || *status >= 500,
            EmbeddingError::Authentication(_)
            | EmbeddingError::InvalidResponse(_)
            | EmbeddingError::Model(_)
            | EmbeddingError::Unavailable { .. } => false,
        }
    }
}

/// Errors from vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("dimension mismatch: collection expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt collection data: {0}")]
    Corrupt(String),
}

/// Errors from document text extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the indexing pipeline.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Chunker(#[from] ChunkerError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("text extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("embedding batch task failed: {0}")]
    BatchJoin(String),
}

/// Errors from retrieval operations.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),
}

/// Errors from the answer-generation service.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation authentication failed: {0}")]
    Authentication(String),

    #[error("failed to reach generation endpoint: {0}")]
    Connection(String),

    #[error("generation endpoint returned status {status}: {body}")]
    Server { status: u16, body: String },

    #[error("invalid generation response: {0}")]
    InvalidResponse(String),

    #[error("generation request timed out")]
    Timeout,

    #[error("generation service unavailable: {0}")]
    Unavailable(String),
}

impl Retryable for GenerationError {
    fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Connection(_) | GenerationError::Timeout => true,
            GenerationError::Server { status, .. } => *status == 429 || *status >= 500,
            GenerationError::Authentication(_)
            | GenerationError::InvalidResponse(_)
            | GenerationError::Unavailable(_) => false,
        }
    }
}

/// Errors from the query pipeline.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    Path(String),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("search error: {0}")]
    Search(#[from] SearchError),

    #[error("query error: {0}")]
    Query(#[from] QueryError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_retryable_classification() {
        assert!(EmbeddingError::Timeout.is_retryable());
        assert!(EmbeddingError::Connection("refused".into()).is_retryable());
        assert!(
            EmbeddingError::Server {
                status: 503,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(
            EmbeddingError::Server {
                status: 429,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(
            !EmbeddingError::Server {
                status: 400,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(!EmbeddingError::Authentication("bad key".into()).is_retryable());
        assert!(!EmbeddingError::InvalidResponse("garbage".into()).is_retryable());
    }

    #[test]
    fn test_generation_retryable_classification() {
        assert!(GenerationError::Timeout.is_retryable());
        assert!(
            GenerationError::Server {
                status: 500,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(!GenerationError::Authentication("missing key".into()).is_retryable());
        assert!(!GenerationError::Unavailable("exhausted".into()).is_retryable());
    }
}
