//! Deterministic text chunking with overlap.

use crate::error::ChunkerError;
use crate::models::{Chunk, Document, EmbeddingConfig};

/// Splits document text into overlapping fixed-size windows.
///
/// Boundaries are a pure function of (text, chunk_size, overlap): no
/// break-point heuristics, so re-indexing the same document always
/// regenerates the same chunks and ids.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Window size in characters.
    chunk_size: usize,
    /// Overlap between consecutive windows in characters.
    overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkerError> {
        if chunk_size == 0 {
            return Err(ChunkerError::InvalidConfiguration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(ChunkerError::InvalidConfiguration(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, ChunkerError> {
        Self::new(config.chunk_size as usize, config.chunk_overlap as usize)
    }

    /// Chunk a document into overlapping segments with stable offsets.
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        self.windows(&document.content)
            .into_iter()
            .enumerate()
            .map(|(idx, (start, end, text))| {
                Chunk::new(&document.id, idx as u32, start as u64, end as u64, text)
            })
            .collect()
    }

    /// Slide a window of `chunk_size` characters with stride
    /// `chunk_size - overlap`. The final window is truncated to the
    /// remaining text, never padded. Empty input yields no windows.
    fn windows(&self, text: &str) -> Vec<(usize, usize, String)> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();

        if total == 0 {
            return Vec::new();
        }

        let mut windows = Vec::new();
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(total);
            windows.push((start, end, chars[start..end].iter().collect()));

            if end >= total {
                break;
            }
            start = end - self.overlap;
        }

        windows
    }
}
