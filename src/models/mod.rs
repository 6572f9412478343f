mod config;
mod document;
mod retrieval;

pub use config::{
    Config, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_API_BASE, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_GENERATION_API_BASE, DEFAULT_GENERATION_MODEL, DEFAULT_LOCAL_EMBEDDING_MODEL,
    EmbedderConfig, EmbeddingConfig, SearchbotConfig,
};
pub use document::{Chunk, Document, DocumentFormat};
pub use retrieval::{
    Answer, AssembledContext, Attribution, EmptyReason, INSUFFICIENT_CONTEXT_ANSWER,
};
