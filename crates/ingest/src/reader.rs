use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::fs;

use crate::document::TextDocument;
use crate::generate_doc_id;

pub struct FileReader;

impl FileReader {
    pub async fn read_file(path: &Path) -> Result<String> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        match extension {
            "txt" | "md" => {
                let content = fs::read_to_string(path)
                    .await
                    .context(format!("Failed to read file: {:?}", path))?;
                Ok(content)
            }
            _ => anyhow::bail!("Unsupported file format: {}", extension),
        }
    }

    /// Read a file into a document with a path-derived ID
    pub async fn read_document(path: &Path) -> Result<TextDocument> {
        let content = Self::read_file(path).await?;
        let path_str = path.to_string_lossy().to_string();

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("txt")
            .to_string();

        let mut document = TextDocument::new(generate_doc_id(&path_str), content).with_format(format);

        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            document = document.with_title(stem);
        }

        // Modification time is the best creation date plain files offer
        if let Ok(modified) = fs::metadata(path).await.and_then(|m| m.modified()) {
            document = document.with_creation_date(DateTime::<Utc>::from(modified));
        }

        Ok(document)
    }

    pub async fn read_directory(dir: &Path) -> Result<Vec<TextDocument>> {
        let mut documents = Vec::new();

        let mut entries = fs::read_dir(dir)
            .await
            .context(format!("Failed to read directory: {:?}", dir))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext == "txt" || ext == "md" {
                        documents.push(Self::read_document(&path).await?);
                    }
                }
            }
        }

        // Directory order is platform dependent
        documents.sort_by(|a, b| a.title.cmp(&b.title));

        tracing::debug!(dir = ?dir, documents = documents.len(), "Read document directory");
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[tokio::test]
    async fn test_read_directory_skips_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "Antrag auf Eingliederungshilfe").unwrap();
        std::fs::write(dir.path().join("b.md"), "# Gutachten").unwrap();
        std::fs::write(dir.path().join("c.pdf"), "binary").unwrap();

        let documents = FileReader::read_directory(dir.path()).await.unwrap();

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].title(), Some("a"));
        assert_eq!(documents[0].document_type(), "Antrag");
        assert_eq!(documents[1].format(), "md");
    }

    #[tokio::test]
    async fn test_read_file_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        std::fs::write(&path, "x").unwrap();

        assert!(FileReader::read_file(&path).await.is_err());
    }
}
