use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::classify_document_type;

/// Read-only view of a source document.
///
/// The graph engine only ever reads documents through this trait; storage and
/// rendering of the original files live elsewhere.
pub trait Document {
    fn id(&self) -> &str;
    fn text(&self) -> &str;
    /// Document category such as "Widerspruch" or "Bescheid".
    fn document_type(&self) -> &str;
    fn page_count(&self) -> usize;
    fn format(&self) -> &str;
    /// Size of the text in bytes.
    fn size(&self) -> usize {
        self.text().len()
    }
    fn creation_date(&self) -> Option<DateTime<Utc>>;
    fn author(&self) -> Option<&str> {
        None
    }
    fn title(&self) -> Option<&str> {
        None
    }
}

/// Plain-text document held in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextDocument {
    pub id: String,
    pub text: String,
    pub document_type: String,
    pub format: String,
    pub creation_date: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub title: Option<String>,
}

impl TextDocument {
    /// Create a document; the type is classified from the text.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let document_type = classify_document_type(&text).as_str().to_string();

        Self {
            id: id.into(),
            text,
            document_type,
            format: "txt".to_string(),
            creation_date: None,
            author: None,
            title: None,
        }
    }

    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = document_type.into();
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_creation_date(mut self, date: DateTime<Utc>) -> Self {
        self.creation_date = Some(date);
        self
    }
}

impl Document for TextDocument {
    fn id(&self) -> &str {
        &self.id
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn document_type(&self) -> &str {
        &self.document_type
    }

    // Pages are separated by form feeds in text exports
    fn page_count(&self) -> usize {
        self.text.matches('\u{c}').count() + 1
    }

    fn format(&self) -> &str {
        &self.format
    }

    fn creation_date(&self) -> Option<DateTime<Utc>> {
        self.creation_date
    }

    fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_document_defaults() {
        let doc = TextDocument::new("doc-1", "Seite eins\u{c}Seite zwei");

        assert_eq!(doc.id(), "doc-1");
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.format(), "txt");
        assert_eq!(doc.size(), doc.text.len());
        assert!(doc.author().is_none());
    }

    #[test]
    fn test_builder_overrides_type() {
        let doc = TextDocument::new("doc-2", "irgendein Text")
            .with_document_type("Widerspruch")
            .with_title("Widerspruch gegen Bescheid");

        assert_eq!(doc.document_type(), "Widerspruch");
        assert_eq!(doc.title(), Some("Widerspruch gegen Bescheid"));
    }
}
