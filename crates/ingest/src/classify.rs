use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DocumentKind {
    Widerspruch,
    Bescheid,
    Antrag,
    Urteil,
    Gutachten,
    Sonstiges,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Widerspruch => "Widerspruch",
            DocumentKind::Bescheid => "Bescheid",
            DocumentKind::Antrag => "Antrag",
            DocumentKind::Urteil => "Urteil",
            DocumentKind::Gutachten => "Gutachten",
            DocumentKind::Sonstiges => "Sonstiges",
        }
    }
}

// Checked in order; the first rule whose markers all appear wins.
const RULES: &[(DocumentKind, &[&str])] = &[
    (DocumentKind::Urteil, &["im namen des volkes"]),
    (DocumentKind::Urteil, &["urteil", "tenor"]),
    (DocumentKind::Widerspruch, &["lege ich", "widerspruch"]),
    (DocumentKind::Widerspruch, &["erhebe", "widerspruch"]),
    (DocumentKind::Widerspruch, &["widerspruch gegen"]),
    (DocumentKind::Widerspruch, &["widerspricht"]),
    (DocumentKind::Bescheid, &["bescheid", "rechtsbehelfsbelehrung"]),
    (DocumentKind::Bescheid, &["wird bewilligt"]),
    (DocumentKind::Bescheid, &["wird abgelehnt"]),
    (DocumentKind::Antrag, &["beantrage"]),
    (DocumentKind::Antrag, &["antrag auf"]),
    (DocumentKind::Gutachten, &["gutachten"]),
];

/// Classify a document by keyword markers in its text.
pub fn classify_document_type(text: &str) -> DocumentKind {
    let lower = text.to_lowercase();

    RULES
        .iter()
        .find(|(_, markers)| markers.iter().all(|m| lower.contains(m)))
        .map(|(kind, _)| *kind)
        .unwrap_or(DocumentKind::Sonstiges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_objection() {
        let text = "Hiermit lege ich Widerspruch gegen den Bescheid vom 01.02.2024 ein.";
        assert_eq!(classify_document_type(text), DocumentKind::Widerspruch);
    }

    #[test]
    fn test_classify_decision() {
        let text = "Bescheid\nIhr Antrag wird abgelehnt.\nRechtsbehelfsbelehrung: ...";
        assert_eq!(classify_document_type(text), DocumentKind::Bescheid);
    }

    #[test]
    fn test_classify_judgment_before_objection() {
        let text = "Im Namen des Volkes ... der Widerspruch gegen den Bescheid war begründet.";
        assert_eq!(classify_document_type(text), DocumentKind::Urteil);
    }

    #[test]
    fn test_classify_fallback() {
        assert_eq!(classify_document_type("Notizen"), DocumentKind::Sonstiges);
    }
}
