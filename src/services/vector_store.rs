//! Local durable vector store with per-collection persistence.
//!
//! Each collection is a directory under the configured root holding a
//! `meta.json` (established dimension) and a `records.json`. Directories can
//! be backed up and restored independently. Writes go through a tmp-file
//! rename so readers never observe a half-written collection.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::VectorStoreError;

const META_FILE: &str = "meta.json";
const RECORDS_FILE: &str = "records.json";

/// Per-chunk metadata persisted alongside the vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_id: String,
    pub source_path: String,
    pub chunk_index: u32,
    pub start_offset: u64,
    pub end_offset: u64,
}

/// One stored (chunk, vector, metadata) record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub chunk_id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionMeta {
    dimension: usize,
}

/// A query hit: record content plus its cosine similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub chunk_id: String,
    pub score: f32,
    pub text: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub name: String,
    pub record_count: usize,
    pub dimension: usize,
}

/// Durable vector store rooted at a directory.
///
/// Writes to one collection serialize on a per-collection lock; reads and
/// writes to other collections proceed concurrently. The lock table is owned
/// by the store and lives for the process lifetime.
pub struct VectorStore {
    root: PathBuf,
    write_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl VectorStore {
    /// Open (creating if needed) a store rooted at the given directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, VectorStoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Insert or replace records by chunk id.
    ///
    /// The first upsert establishes the collection's dimension; any record
    /// that disagrees with it fails the whole call with `DimensionMismatch`
    /// before anything is written.
    pub async fn upsert(
        &self,
        collection: &str,
        records: Vec<VectorRecord>,
    ) -> Result<(), VectorStoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let lock = self.write_lock(collection);
        let _guard = lock.lock().await;

        let dir = self.collection_dir(collection);
        std::fs::create_dir_all(&dir)?;

        let meta = self.load_meta(&dir)?;
        let expected = meta
            .map(|m| m.dimension)
            .unwrap_or_else(|| records[0].vector.len());
        for record in &records {
            if record.vector.len() != expected {
                return Err(VectorStoreError::DimensionMismatch {
                    expected,
                    actual: record.vector.len(),
                });
            }
        }

        let mut existing = self.load_records(&dir)?;
        for record in records {
            match existing
                .iter_mut()
                .find(|r| r.chunk_id == record.chunk_id)
            {
                Some(slot) => *slot = record,
                None => existing.push(record),
            }
        }

        write_json(&dir.join(META_FILE), &CollectionMeta { dimension: expected })?;
        write_json(&dir.join(RECORDS_FILE), &existing)?;

        debug!(collection, records = existing.len(), "collection persisted");
        Ok(())
    }

    /// Nearest-neighbor query by cosine similarity.
    ///
    /// Results come back in descending score order with ties broken by
    /// ascending chunk id, and `k` is clamped to the collection size.
    pub async fn query(
        &self,
        collection: &str,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredRecord>, VectorStoreError> {
        let dir = self.collection_dir(collection);
        if !dir.is_dir() {
            return Err(VectorStoreError::CollectionNotFound(collection.to_string()));
        }

        if let Some(meta) = self.load_meta(&dir)?
            && query_vector.len() != meta.dimension
        {
            return Err(VectorStoreError::DimensionMismatch {
                expected: meta.dimension,
                actual: query_vector.len(),
            });
        }

        let records = self.load_records(&dir)?;
        let mut scored: Vec<ScoredRecord> = records
            .into_iter()
            .map(|record| ScoredRecord {
                score: cosine_similarity(query_vector, &record.vector),
                chunk_id: record.chunk_id,
                text: record.text,
                metadata: record.metadata,
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        scored.truncate(k);

        Ok(scored)
    }

    /// Delete records by chunk id. Ids that do not exist are ignored.
    pub async fn delete(
        &self,
        collection: &str,
        chunk_ids: &HashSet<String>,
    ) -> Result<(), VectorStoreError> {
        let dir = self.collection_dir(collection);
        if !dir.is_dir() {
            return Ok(());
        }

        let lock = self.write_lock(collection);
        let _guard = lock.lock().await;

        let mut records = self.load_records(&dir)?;
        records.retain(|record| !chunk_ids.contains(&record.chunk_id));
        write_json(&dir.join(RECORDS_FILE), &records)?;
        Ok(())
    }

    /// List collection names, sorted.
    pub fn list_collections(&self) -> Result<Vec<String>, VectorStoreError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub async fn collection_stats(
        &self,
        collection: &str,
    ) -> Result<CollectionStats, VectorStoreError> {
        let dir = self.collection_dir(collection);
        if !dir.is_dir() {
            return Err(VectorStoreError::CollectionNotFound(collection.to_string()));
        }

        let records = self.load_records(&dir)?;
        let dimension = self.load_meta(&dir)?.map(|m| m.dimension).unwrap_or(0);
        Ok(CollectionStats {
            name: collection.to_string(),
            record_count: records.len(),
            dimension,
        })
    }

    /// Remove a collection and everything in it. Missing collections are a
    /// no-op.
    pub async fn delete_collection(&self, collection: &str) -> Result<(), VectorStoreError> {
        let lock = self.write_lock(collection);
        let _guard = lock.lock().await;

        let dir = self.collection_dir(collection);
        if dir.is_dir() {
            std::fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(collection)
    }

    fn write_lock(&self, collection: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .write_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(collection.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn load_meta(&self, dir: &Path) -> Result<Option<CollectionMeta>, VectorStoreError> {
        let path = dir.join(META_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| VectorStoreError::Corrupt(format!("{}: {}", path.display(), e)))
    }

    fn load_records(&self, dir: &Path) -> Result<Vec<VectorRecord>, VectorStoreError> {
        let path = dir.join(RECORDS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content)
            .map_err(|e| VectorStoreError::Corrupt(format!("{}: {}", path.display(), e)))
    }
}

/// Write JSON atomically: serialize to a sibling tmp file, then rename.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), VectorStoreError> {
    let content = serde_json::to_string(value)
        .map_err(|e| VectorStoreError::Corrupt(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Cosine similarity in [-1, 1]; zero-norm vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
