use regex::Regex;
use std::sync::LazyLock;

use super::{EntityExtractor, canonical_term, compile_patterns, compile_vocabulary, non_overlapping};
use crate::schema::{Entity, EntityAttributes, EntityType};
use crate::text::classify_by_keyword;

static COMPOUND_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[r"\b[A-ZÄÖÜ][a-zäöüß]*verfahren[s]?\b"])
});

const KNOWN_PROCEDURES: &[&str] = &["Teilhabeplanung", "Gesamtplanung", "Bedarfsermittlung", "Begutachtung"];

static VOCABULARY: LazyLock<Regex> = LazyLock::new(|| compile_vocabulary(KNOWN_PROCEDURES));

const CATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("widerspruch", "Widerspruch"),
    ("klage", "Gericht"),
    ("gericht", "Gericht"),
    ("eilverfahren", "Eilverfahren"),
    ("einstweilig", "Eilverfahren"),
    ("antrag", "Antrag"),
    ("plan", "Planung"),
    ("bedarf", "Planung"),
    ("gutacht", "Begutachtung"),
];

pub fn classify_procedure(name: &str) -> &'static str {
    classify_by_keyword(&name.to_lowercase(), CATEGORY_KEYWORDS, "Verwaltung")
}

pub struct ProcedureExtractor;

impl EntityExtractor for ProcedureExtractor {
    fn entity_type(&self) -> EntityType {
        EntityType::Procedure
    }

    fn extract(&self, text: &str, document_id: &str) -> Vec<Entity> {
        let mut spans: Vec<(usize, usize, String)> = COMPOUND_PATTERNS
            .iter()
            .flat_map(|pattern| pattern.find_iter(text))
            .map(|m| {
                let name = m.as_str().strip_suffix('s').unwrap_or(m.as_str());
                (m.start(), m.end(), name.to_string())
            })
            .collect();

        spans.extend(VOCABULARY.find_iter(text).filter_map(|m| {
            canonical_term(KNOWN_PROCEDURES, m.as_str()).map(|name| (m.start(), m.end(), name.to_string()))
        }));

        non_overlapping(spans)
            .into_iter()
            .map(|(start, end, name)| {
                let category = classify_procedure(&name).to_string();
                Entity::new(
                    EntityType::Procedure,
                    name,
                    EntityAttributes::Procedure { category },
                    document_id,
                    0.75,
                )
                .with_mention(start, end)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compounds_and_vocabulary() {
        let text = "Im Widerspruchsverfahren wurde die Teilhabeplanung nachgeholt.";
        let entities = ProcedureExtractor.extract(text, "doc-1");
        let names: Vec<&str> = entities.iter().map(|e| e.name.as_str()).collect();

        assert_eq!(names, vec!["Widerspruchsverfahren", "Teilhabeplanung"]);
        assert_eq!(entities[0].property("category"), Some(serde_json::json!("Widerspruch")));
        assert_eq!(entities[1].property("category"), Some(serde_json::json!("Planung")));
        assert_eq!(entities[0].confidence, 0.75);
    }

    #[test]
    fn test_genitive_converges() {
        let a = ProcedureExtractor.extract("des Antragsverfahrens", "doc-1");
        let b = ProcedureExtractor.extract("das Antragsverfahren", "doc-2");
        assert_eq!(a[0].name, "Antragsverfahren");
        assert_eq!(a[0].id, b[0].id);
    }
}
