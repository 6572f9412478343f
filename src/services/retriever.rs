//! Retrieval: query embedding, nearest-neighbor search, context assembly.

use std::sync::Arc;

use tracing::debug;

use crate::error::{EmbeddingError, SearchError, VectorStoreError};
use crate::models::{AssembledContext, Attribution, EmptyReason};
use crate::services::embedding::{EmbedPurpose, Embedder};
use crate::services::vector_store::{ScoredRecord, VectorStore};

/// Retrieves relevant chunks and assembles them into a bounded context.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<VectorStore>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<VectorStore>) -> Self {
        Self {
            embedder,
            store,
        }
    }

    /// Embed the query, fetch the top `k` candidates, and greedily pack
    /// them into a context no longer than `max_context_chars`.
    ///
    /// An empty or nonexistent collection is not an error: the caller gets
    /// an empty context marked `no_results` and decides what to do with it.
    pub async fn retrieve(
        &self,
        collection: &str,
        query_text: &str,
        k: usize,
        max_context_chars: usize,
    ) -> Result<AssembledContext, SearchError> {
        let query = vec![query_text.to_string()];
        let vectors = self.embedder.embed(&query, EmbedPurpose::Query).await?;
        let query_vector = vectors.into_iter().next().ok_or_else(|| {
            EmbeddingError::InvalidResponse("empty embedding response".to_string())
        })?;

        let candidates = match self.store.query(collection, &query_vector, k).await {
            Ok(candidates) => candidates,
            Err(VectorStoreError::CollectionNotFound(name)) => {
                debug!(collection = %name, "collection does not exist");
                Vec::new()
            }
            Err(err) => return Err(err.into()),
        };

        if candidates.is_empty() {
            return Ok(AssembledContext::empty(EmptyReason::NoResults));
        }

        Ok(assemble_context(&candidates, max_context_chars))
    }
}

/// Greedily append candidates in rank order, skipping any whose block would
/// push the context past the budget. A lower-ranked but shorter chunk may
/// still fit after a longer one was skipped.
fn assemble_context(candidates: &[ScoredRecord], max_context_chars: usize) -> AssembledContext {
    let mut text = String::new();
    let mut total_chars = 0usize;
    let mut attributions = Vec::new();

    for (position, record) in candidates.iter().enumerate() {
        let block = format!(
            "Document {} (source: {}, chunk {}, relevance: {:.2}):\n{}",
            position + 1,
            record.metadata.source_path,
            record.metadata.chunk_index,
            record.score,
            record.text
        );
        let block_chars = block.chars().count();
        let separator_chars = if text.is_empty() { 0 } else { 2 };

        if total_chars + separator_chars + block_chars > max_context_chars {
            continue;
        }

        if separator_chars > 0 {
            text.push_str("\n\n");
        }
        text.push_str(&block);
        total_chars += separator_chars + block_chars;

        attributions.push(Attribution {
            source_id: record.metadata.source_id.clone(),
            source_path: record.metadata.source_path.clone(),
            chunk_index: record.metadata.chunk_index,
            score: record.score,
        });
    }

    AssembledContext {
        text,
        attributions,
        reason: None,
    }
}
