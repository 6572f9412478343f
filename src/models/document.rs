use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Document format tag, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Txt,
    Md,
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Derive the format from a path's extension, if it is a known one.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "txt" => Some(DocumentFormat::Txt),
            "md" | "markdown" => Some(DocumentFormat::Md),
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" | "doc" => Some(DocumentFormat::Docx),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Txt => write!(f, "txt"),
            DocumentFormat::Md => write!(f, "md"),
            DocumentFormat::Pdf => write!(f, "pdf"),
            DocumentFormat::Docx => write!(f, "docx"),
        }
    }
}

/// An ingested document. Immutable once chunked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable id derived from the source path.
    pub id: String,
    pub source_path: String,
    pub format: DocumentFormat,
    pub content: String,
    pub ingested_at: String,
}

impl Document {
    /// Derive a stable document id from the source path.
    ///
    /// The same source always maps to the same id, which is what lets
    /// re-ingestion overwrite rather than duplicate.
    pub fn generate_id(source_path: &str) -> String {
        use sha2::{Digest, Sha256};
        let hash = Sha256::digest(source_path.as_bytes());
        hex::encode(&hash[..16])
    }

    pub fn new(source_path: impl Into<String>, format: DocumentFormat, content: String) -> Self {
        let source_path = source_path.into();
        let id = Self::generate_id(&source_path);
        Self {
            id,
            source_path,
            format,
            content,
            ingested_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A contiguous slice of a document's text, created once during indexing.
///
/// Offsets are character (not byte) positions into the source content, and
/// consecutive chunks overlap by the configured amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: u32,
    pub start_offset: u64,
    pub end_offset: u64,
    pub text: String,
}

impl Chunk {
    /// Deterministic chunk id: the same document and index always produce
    /// the same id, so re-indexing upserts in place.
    pub fn generate_id(document_id: &str, chunk_index: u32) -> String {
        use uuid::Uuid;
        let name = format!("{}:{}", document_id, chunk_index);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    pub fn new(
        document_id: &str,
        chunk_index: u32,
        start_offset: u64,
        end_offset: u64,
        text: String,
    ) -> Self {
        Self {
            id: Self::generate_id(document_id, chunk_index),
            document_id: document_id.to_string(),
            chunk_index,
            start_offset,
            end_offset,
            text,
        }
    }
}
