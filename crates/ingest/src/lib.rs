pub mod classify;
pub mod document;
pub mod reader;

pub use classify::{DocumentKind, classify_document_type};
pub use document::{Document, TextDocument};
pub use reader::FileReader;

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Generate a stable document ID from file path
pub fn generate_doc_id(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Load a single document from disk
pub async fn ingest_file(file_path: &Path) -> Result<TextDocument> {
    FileReader::read_document(file_path).await
}

/// Load every supported document in a directory
pub async fn ingest_directory(dir_path: &Path) -> Result<Vec<TextDocument>> {
    FileReader::read_directory(dir_path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_id_is_stable() {
        let a = generate_doc_id("data/widerspruch.txt");
        let b = generate_doc_id("data/widerspruch.txt");
        let c = generate_doc_id("data/bescheid.txt");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }
}
