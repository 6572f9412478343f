//! File utilities for document ingestion.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::error::ExtractError;
use crate::models::DocumentFormat;

/// Calculate SHA-256 checksum of content.
pub fn calculate_checksum(content: &str) -> String {
    let hash = Sha256::digest(content.as_bytes());
    hex::encode(hash)
}

/// Extract plain text from a document on disk.
///
/// Plain-text and Markdown files are read directly. PDF and Word documents
/// are recognized formats whose extraction is delegated to external tooling;
/// this build refuses them rather than guessing at their contents.
pub fn extract_text(path: &Path) -> Result<String, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::NotFound(path.display().to_string()));
    }

    match DocumentFormat::from_path(path) {
        Some(DocumentFormat::Txt) | Some(DocumentFormat::Md) => Ok(fs::read_to_string(path)?),
        Some(format) => Err(ExtractError::UnsupportedFormat(format!(
            "{} extraction requires external tooling: {}",
            format,
            path.display()
        ))),
        None => Err(ExtractError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Check whether a path points at a document this build can extract text from.
pub fn is_supported_document(path: &Path) -> bool {
    matches!(
        DocumentFormat::from_path(path),
        Some(DocumentFormat::Txt | DocumentFormat::Md)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_calculate_checksum() {
        let checksum = calculate_checksum("hello world");
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, calculate_checksum("hello world"));
        assert_ne!(checksum, calculate_checksum("hello worlds"));
    }

    #[test]
    fn test_extract_text_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "some notes").unwrap();

        let text = extract_text(&path).unwrap();
        assert_eq!(text, "some notes\n");
    }

    #[test]
    fn test_extract_text_missing_file() {
        let err = extract_text(Path::new("/nonexistent/file.txt")).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
    }

    #[test]
    fn test_extract_text_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        fs::File::create(&path).unwrap();

        let err = extract_text(&path).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_is_supported_document() {
        assert!(is_supported_document(Path::new("a.txt")));
        assert!(is_supported_document(Path::new("a.md")));
        assert!(!is_supported_document(Path::new("a.pdf")));
        assert!(!is_supported_document(Path::new("a.rs")));
    }
}
