//! Indexing pipeline: chunk, embed in batches, upsert.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{EmbeddingError, IndexError, VectorStoreError};
use crate::models::{Chunk, Document};
use crate::services::chunker::TextChunker;
use crate::services::embedding::{EmbedPurpose, Embedder};
use crate::services::vector_store::{ChunkMetadata, VectorRecord, VectorStore};

/// Inclusive range of chunk indices within one document.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChunkRange {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedRange {
    pub range: ChunkRange,
    pub error: String,
}

/// Outcome of indexing one document.
///
/// Batches that embedded and upserted stay committed even when later ones
/// fail; `failed` tells the caller exactly which chunk ranges to re-run.
/// Re-running with identical inputs regenerates identical chunk ids, so the
/// retry upserts in place.
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub document_id: String,
    pub collection: String,
    pub total_chunks: usize,
    pub indexed: Vec<ChunkRange>,
    pub failed: Vec<FailedRange>,
}

impl IndexReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn indexed_chunks(&self) -> usize {
        self.indexed
            .iter()
            .map(|r| (r.end - r.start + 1) as usize)
            .sum()
    }
}

/// Orchestrates Chunker -> Embedding Provider -> Vector Store for one
/// document at a time.
pub struct IndexingPipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<VectorStore>,
    batch_size: usize,
    max_concurrent_batches: usize,
}

impl IndexingPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<VectorStore>,
        batch_size: usize,
        max_concurrent_batches: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            batch_size: batch_size.max(1),
            max_concurrent_batches: max_concurrent_batches.max(1),
        }
    }

    /// Index one document into a collection.
    ///
    /// Embedding batches run concurrently under a bounded semaphore; since
    /// completion order is not deterministic, each batch is tagged with its
    /// index and the results are re-sorted before any upsert, so records
    /// always land in original chunk order.
    pub async fn index_document(
        &self,
        document: &Document,
        collection: &str,
        chunk_size: usize,
        overlap: usize,
    ) -> Result<IndexReport, IndexError> {
        let chunker = TextChunker::new(chunk_size, overlap)?;
        let chunks = chunker.chunk(document);

        let mut report = IndexReport {
            document_id: document.id.clone(),
            collection: collection.to_string(),
            total_chunks: chunks.len(),
            indexed: Vec::new(),
            failed: Vec::new(),
        };

        if chunks.is_empty() {
            debug!(document = %document.id, "document produced no chunks");
            return Ok(report);
        }

        let batches: Vec<Vec<Chunk>> = chunks
            .chunks(self.batch_size)
            .map(|batch| batch.to_vec())
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_batches));
        let mut tasks = JoinSet::new();

        for (batch_index, batch) in batches.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let embedder = self.embedder.clone();
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore never closed");
                let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
                let result = embedder.embed(&texts, EmbedPurpose::Document).await;
                (batch_index, batch, result)
            });
        }

        let mut embedded = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(item) => embedded.push(item),
                Err(err) => return Err(IndexError::BatchJoin(err.to_string())),
            }
        }
        embedded.sort_by_key(|(batch_index, _, _)| *batch_index);

        for (_, batch, result) in embedded {
            let range = ChunkRange {
                start: batch[0].chunk_index,
                end: batch[batch.len() - 1].chunk_index,
            };

            match result {
                Ok(vectors) => {
                    if vectors.len() != batch.len() {
                        report.failed.push(FailedRange {
                            range,
                            error: EmbeddingError::InvalidResponse(format!(
                                "expected {} vectors, got {}",
                                batch.len(),
                                vectors.len()
                            ))
                            .to_string(),
                        });
                        continue;
                    }

                    let records: Vec<VectorRecord> = batch
                        .into_iter()
                        .zip(vectors)
                        .map(|(chunk, vector)| VectorRecord {
                            chunk_id: chunk.id,
                            vector,
                            text: chunk.text,
                            metadata: ChunkMetadata {
                                source_id: chunk.document_id,
                                source_path: document.source_path.clone(),
                                chunk_index: chunk.chunk_index,
                                start_offset: chunk.start_offset,
                                end_offset: chunk.end_offset,
                            },
                        })
                        .collect();

                    match self.store.upsert(collection, records).await {
                        Ok(()) => report.indexed.push(range),
                        // Mixing embedding spaces would corrupt the
                        // collection; abort instead of recording and moving on
                        Err(err @ VectorStoreError::DimensionMismatch { .. }) => {
                            return Err(err.into());
                        }
                        Err(err) => report.failed.push(FailedRange {
                            range,
                            error: err.to_string(),
                        }),
                    }
                }
                Err(err) => {
                    warn!(
                        document = %document.id,
                        start = range.start,
                        end = range.end,
                        error = %err,
                        "embedding batch failed"
                    );
                    report.failed.push(FailedRange {
                        range,
                        error: err.to_string(),
                    });
                }
            }
        }

        debug!(
            document = %document.id,
            collection,
            indexed = report.indexed_chunks(),
            failed = report.failed.len(),
            "document indexed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChunkerError;
    use crate::models::DocumentFormat;
    use crate::services::embedding::test_support::{FailingEmbedder, StaticEmbedder};
    use crate::services::embedding::EmbedderKind;
    use std::sync::atomic::{AtomicU32, Ordering};
    use async_trait::async_trait;

    fn test_document(content: &str) -> Document {
        Document::new("/docs/a.txt", DocumentFormat::Txt, content.to_string())
    }

    fn open_store(dir: &std::path::Path) -> Arc<VectorStore> {
        Arc::new(VectorStore::open(dir).unwrap())
    }

    #[tokio::test]
    async fn test_index_document_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let embedder = Arc::new(StaticEmbedder::new(EmbedderKind::Local, 4, 0.5));
        let pipeline = IndexingPipeline::new(embedder, store.clone(), 2, 2);

        let doc = test_document(&"word ".repeat(100)); // 500 chars
        let report = pipeline.index_document(&doc, "docs", 100, 20).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.total_chunks, 6);
        assert_eq!(report.indexed_chunks(), 6);

        let stats = store.collection_stats("docs").await.unwrap();
        assert_eq!(stats.record_count, 6);
        assert_eq!(stats.dimension, 4);
    }

    #[tokio::test]
    async fn test_empty_document_reports_zero_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let embedder = Arc::new(StaticEmbedder::new(EmbedderKind::Local, 4, 0.5));
        let pipeline = IndexingPipeline::new(embedder, store, 8, 2);

        let report = pipeline
            .index_document(&test_document(""), "docs", 100, 20)
            .await
            .unwrap();

        assert_eq!(report.total_chunks, 0);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_invalid_chunking_configuration_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let embedder = Arc::new(StaticEmbedder::new(EmbedderKind::Local, 4, 0.5));
        let pipeline = IndexingPipeline::new(embedder, store, 8, 2);

        let err = pipeline
            .index_document(&test_document("text"), "docs", 100, 100)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IndexError::Chunker(ChunkerError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_all_batches_fail_without_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let embedder = Arc::new(FailingEmbedder::new(|| EmbeddingError::Unavailable {
            attempts: 3,
            last_error: "down".to_string(),
        }));
        let pipeline = IndexingPipeline::new(embedder, store.clone(), 2, 2);

        let doc = test_document(&"x".repeat(500));
        let report = pipeline.index_document(&doc, "docs", 100, 0).await.unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.indexed_chunks(), 0);
        assert_eq!(report.failed.len(), 3); // 5 chunks in batches of 2
        // Failed ranges cover every chunk exactly once, in order
        let covered: Vec<(u32, u32)> = report
            .failed
            .iter()
            .map(|f| (f.range.start, f.range.end))
            .collect();
        assert_eq!(covered, vec![(0, 1), (2, 3), (4, 4)]);
    }

    /// Fails only for the batch containing a marker text.
    struct SelectiveEmbedder {
        dimension: usize,
        poison: String,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Embedder for SelectiveEmbedder {
        fn kind(&self) -> EmbedderKind {
            EmbedderKind::Local
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        async fn embed(
            &self,
            texts: &[String],
            _purpose: EmbedPurpose,
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if texts.iter().any(|t| t.contains(&self.poison)) {
                return Err(EmbeddingError::Unavailable {
                    attempts: 3,
                    last_error: "poisoned batch".to_string(),
                });
            }
            Ok(texts.iter().map(|_| vec![1.0; self.dimension]).collect())
        }
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_committed_batches() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        // 30 chars / size 10 / overlap 0 -> 3 chunks, batch_size 1 -> 3 batches;
        // the middle chunk poisons its batch
        let content = format!("{}{}{}", "a".repeat(10), "POISONXXXX", "c".repeat(10));
        let embedder = Arc::new(SelectiveEmbedder {
            dimension: 4,
            poison: "POISON".to_string(),
            calls: AtomicU32::new(0),
        });
        let pipeline = IndexingPipeline::new(embedder, store.clone(), 1, 2);

        let doc = test_document(&content);
        let report = pipeline.index_document(&doc, "docs", 10, 0).await.unwrap();

        assert_eq!(report.total_chunks, 3);
        assert_eq!(report.indexed_chunks(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].range.start, 1);
        assert_eq!(report.failed[0].range.end, 1);

        // Successful batches stay committed
        let stats = store.collection_stats("docs").await.unwrap();
        assert_eq!(stats.record_count, 2);
    }

    #[tokio::test]
    async fn test_reindexing_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let embedder = Arc::new(StaticEmbedder::new(EmbedderKind::Local, 4, 0.5));
        let pipeline = IndexingPipeline::new(embedder, store.clone(), 2, 2);

        let doc = test_document(&"repeatable text ".repeat(30));
        pipeline.index_document(&doc, "docs", 100, 20).await.unwrap();
        let first = store.collection_stats("docs").await.unwrap().record_count;

        pipeline.index_document(&doc, "docs", 100, 20).await.unwrap();
        let second = store.collection_stats("docs").await.unwrap().record_count;

        // Identical inputs regenerate identical chunk ids; upsert dedupes
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());

        // Establish the collection at dimension 4
        let first = Arc::new(StaticEmbedder::new(EmbedderKind::Remote, 4, 0.5));
        let pipeline = IndexingPipeline::new(first, store.clone(), 8, 2);
        pipeline
            .index_document(&test_document("seed text"), "docs", 100, 20)
            .await
            .unwrap();

        // A different provider dimension must never be mixed in silently
        let second = Arc::new(StaticEmbedder::new(EmbedderKind::Local, 3, 0.5));
        let pipeline = IndexingPipeline::new(second, store.clone(), 8, 2);
        let err = pipeline
            .index_document(&test_document("other text"), "docs", 100, 20)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IndexError::VectorStore(VectorStoreError::DimensionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_records_preserve_chunk_order_across_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let embedder = Arc::new(StaticEmbedder::new(EmbedderKind::Local, 2, 1.0));
        // Many small batches with wide concurrency
        let pipeline = IndexingPipeline::new(embedder, store.clone(), 1, 8);

        let doc = test_document(&"0123456789".repeat(12)); // 120 chars -> 12 chunks
        let report = pipeline.index_document(&doc, "docs", 10, 0).await.unwrap();

        assert!(report.is_complete());
        let starts: Vec<u32> = report.indexed.iter().map(|r| r.start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
        assert_eq!(report.indexed_chunks(), 12);
    }
}
