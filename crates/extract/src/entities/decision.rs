use regex::Regex;
use std::sync::LazyLock;

use super::{EntityExtractor, compile_patterns};
use crate::normalizer::parse_german_date;
use crate::schema::{DecisionKind, Entity, EntityAttributes, EntityType};
use crate::text::{classify_by_keyword, window};

// "Bescheid vom 15.03.2024", "Ablehnungsbescheid", "Widerspruchsbescheides"
static DECISION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"\b(?P<word>[A-ZÄÖÜ][a-zäöüß]*bescheid|Bescheid)(?:e?s)?\b(?:\s+vom\s+(?P<date>\d{1,2}\.\s?\d{1,2}\.\s?\d{4}))?",
    ])
});

const KIND_KEYWORDS: &[(&str, DecisionKind)] = &[
    ("widerspruch", DecisionKind::ObjectionDecision),
    ("ablehn", DecisionKind::Rejection),
    ("abgelehnt", DecisionKind::Rejection),
    ("bewillig", DecisionKind::Approval),
    ("änderung", DecisionKind::Amendment),
];

const KIND_RADIUS: usize = 100;

pub struct DecisionExtractor;

impl EntityExtractor for DecisionExtractor {
    fn entity_type(&self) -> EntityType {
        EntityType::Decision
    }

    fn extract(&self, text: &str, document_id: &str) -> Vec<Entity> {
        let mut entities = Vec::new();

        for pattern in DECISION_PATTERNS.iter() {
            for caps in pattern.captures_iter(text) {
                let (Some(whole), Some(word)) = (caps.get(0), caps.name("word")) else {
                    continue;
                };

                let date = caps.name("date").and_then(|m| parse_german_date(m.as_str()));
                let name = match date {
                    Some(date) => format!("{} vom {}", word.as_str(), date.format("%d.%m.%Y")),
                    None => word.as_str().to_string(),
                };

                // The compound itself wins over surrounding wording
                let lowered = word.as_str().to_lowercase();
                let mut decision_kind = classify_by_keyword(&lowered, KIND_KEYWORDS, DecisionKind::Other);
                if decision_kind == DecisionKind::Other {
                    let after = window(text, whole.end(), whole.end(), 0, KIND_RADIUS).to_lowercase();
                    decision_kind = classify_by_keyword(&after, KIND_KEYWORDS, DecisionKind::Other);
                }

                entities.push(
                    Entity::new(
                        EntityType::Decision,
                        name,
                        EntityAttributes::Decision { decision_kind, date },
                        document_id,
                        0.8,
                    )
                    .with_mention(whole.start(), whole.end()),
                );
            }
        }

        entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn kind_of(entity: &Entity) -> DecisionKind {
        match &entity.attributes {
            EntityAttributes::Decision { decision_kind, .. } => *decision_kind,
            other => panic!("unexpected attributes {other:?}"),
        }
    }

    #[test]
    fn test_dated_decision() {
        let text = "Der Antragsteller widerspricht gemäß § 29 SGB IX dem Bescheid vom 15.03.2024 des Sozialamt München.";
        let entities = DecisionExtractor.extract(text, "doc-1");

        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].name, "Bescheid vom 15.03.2024");
        assert_eq!(entities[0].confidence, 0.8);
        match &entities[0].attributes {
            EntityAttributes::Decision { date, .. } => {
                assert_eq!(*date, NaiveDate::from_ymd_opt(2024, 3, 15));
            }
            other => panic!("unexpected attributes {other:?}"),
        }
    }

    #[test]
    fn test_compound_kind() {
        let entities = DecisionExtractor.extract("Gegen den Ablehnungsbescheid und den Widerspruchsbescheid", "doc-1");

        assert_eq!(entities.len(), 2);
        assert_eq!(kind_of(&entities[0]), DecisionKind::Rejection);
        assert_eq!(kind_of(&entities[1]), DecisionKind::ObjectionDecision);
    }

    #[test]
    fn test_kind_from_following_text() {
        let entities = DecisionExtractor.extract("Mit Bescheid wurde der Antrag abgelehnt.", "doc-1");

        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].name, "Bescheid");
        assert_eq!(kind_of(&entities[0]), DecisionKind::Rejection);
    }

    #[test]
    fn test_genitive_form() {
        let entities = DecisionExtractor.extract("Aufhebung des Bescheides vom 1.2.2024", "doc-1");

        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].name, "Bescheid vom 01.02.2024");
    }
}
