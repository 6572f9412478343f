mod chunker;
mod embedding;
mod generation;
mod pipeline;
mod query;
mod retriever;
mod vector_store;

pub use chunker::TextChunker;
pub use embedding::{
    EmbedPurpose, Embedder, EmbedderKind, FailoverEmbedder, GEMINI_API_KEY_ENV, LocalEmbedder,
    RemoteEmbedder, build_embedder,
};
pub use generation::{GenerationService, MISTRAL_API_KEY_ENV, MistralClient};
pub use pipeline::{ChunkRange, FailedRange, IndexReport, IndexingPipeline};
pub use query::QueryPipeline;
pub use retriever::Retriever;
pub use vector_store::{
    ChunkMetadata, CollectionStats, ScoredRecord, VectorRecord, VectorStore, cosine_similarity,
};
