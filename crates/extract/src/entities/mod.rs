//! Typed entity extractors.
//!
//! Each extractor is a pure function of `(text, document_id)` driven by a
//! table of compiled patterns or a fixed vocabulary. None of them share state,
//! so they can run in any order.

pub mod amount;
pub mod authority;
pub mod case_number;
pub mod date;
pub mod decision;
pub mod law;
pub mod paragraph;
pub mod person;
pub mod procedure;
pub mod service;

pub use amount::AmountExtractor;
pub use authority::AuthorityExtractor;
pub use case_number::CaseNumberExtractor;
pub use date::DateExtractor;
pub use decision::DecisionExtractor;
pub use law::LawExtractor;
pub use paragraph::ParagraphExtractor;
pub use person::PersonExtractor;
pub use procedure::ProcedureExtractor;
pub use service::ServiceExtractor;

use regex::Regex;

use crate::schema::{Entity, EntityType};

pub trait EntityExtractor: Send + Sync {
    fn entity_type(&self) -> EntityType;

    fn extract(&self, text: &str, document_id: &str) -> Vec<Entity>;
}

/// All built-in extractors, paragraph law lookup over `law_window` bytes.
pub fn default_extractors(law_window: usize) -> Vec<Box<dyn EntityExtractor>> {
    vec![
        Box::new(LawExtractor),
        Box::new(ParagraphExtractor::new(law_window)),
        Box::new(AuthorityExtractor),
        Box::new(ServiceExtractor),
        Box::new(DateExtractor),
        Box::new(AmountExtractor),
        Box::new(CaseNumberExtractor),
        Box::new(DecisionExtractor),
        Box::new(ProcedureExtractor),
        Box::new(PersonExtractor),
    ]
}

/// Compile a built-in pattern table.
pub(crate) fn compile_patterns(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).unwrap_or_else(|e| panic!("invalid built-in pattern {p}: {e}")))
        .collect()
}

/// Case-insensitive whole-word alternation over a vocabulary, longest first.
pub(crate) fn compile_vocabulary(terms: &[&str]) -> Regex {
    let mut sorted: Vec<&str> = terms.to_vec();
    sorted.sort_by_key(|t| std::cmp::Reverse(t.len()));
    let alternation = sorted
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(r"(?i)\b(?:{})\b", alternation);
    Regex::new(&pattern).unwrap_or_else(|e| panic!("invalid vocabulary pattern: {e}"))
}

/// Canonical spelling of a vocabulary term matched case-insensitively.
pub(crate) fn canonical_term<'a>(terms: &[&'a str], matched: &str) -> Option<&'a str> {
    let lowered = matched.to_lowercase();
    terms.iter().copied().find(|t| t.to_lowercase() == lowered)
}

/// Non-overlapping subset of spans: earliest start first, longest on ties.
pub(crate) fn non_overlapping<T>(mut spans: Vec<(usize, usize, T)>) -> Vec<(usize, usize, T)> {
    spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
    let mut kept: Vec<(usize, usize, T)> = Vec::with_capacity(spans.len());
    for span in spans {
        if kept.last().is_some_and(|last| span.0 < last.1) {
            continue;
        }
        kept.push(span);
    }
    kept
}

// Capitalised words that follow an authority or salutation but are not names
pub(crate) const NAME_STOPWORDS: &[&str] = &[
    "Der", "Die", "Das", "Den", "Dem", "Des", "Ein", "Eine", "Einen", "Vom", "Von", "Mit", "Und",
    "Nach", "Gemäß", "Im", "In", "Am", "Zum", "Zur", "Bescheid", "Antrag",
];
