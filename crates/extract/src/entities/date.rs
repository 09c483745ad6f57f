use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

use super::{EntityExtractor, compile_patterns, non_overlapping};
use crate::normalizer::parse_german_date;
use crate::schema::{DateRole, Entity, EntityAttributes, EntityType};
use crate::text::{classify_by_keyword, window_lower};

static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"\b\d{1,2}\.\s?\d{1,2}\.\s?\d{4}\b",
        r"(?i)\b\d{1,2}\.?\s*(?:januar|jänner|februar|märz|maerz|april|mai|juni|juli|august|september|oktober|november|dezember)\s+\d{4}\b",
    ])
});

const ROLE_RADIUS: usize = 50;

const ROLE_KEYWORDS: &[(&str, DateRole)] = &[
    ("frist", DateRole::Deadline),
    ("bescheid", DateRole::DecisionDate),
    ("antrag", DateRole::ApplicationDate),
    ("widerspruch", DateRole::ObjectionDate),
];

pub struct DateExtractor;

impl EntityExtractor for DateExtractor {
    fn entity_type(&self) -> EntityType {
        EntityType::Date
    }

    fn extract(&self, text: &str, document_id: &str) -> Vec<Entity> {
        let spans: Vec<(usize, usize, ())> = DATE_PATTERNS
            .iter()
            .flat_map(|pattern| pattern.find_iter(text))
            .map(|m| (m.start(), m.end(), ()))
            .collect();

        non_overlapping(spans)
            .into_iter()
            .filter_map(|(start, end, ())| {
                let surface = &text[start..end];
                let Some(date) = parse_german_date(surface) else {
                    trace!(surface, "skipping unparseable date");
                    return None;
                };

                let context = window_lower(text, start, end, ROLE_RADIUS);
                let date_type = classify_by_keyword(&context, ROLE_KEYWORDS, DateRole::Other);

                Some(
                    Entity::new(
                        EntityType::Date,
                        date.format("%d.%m.%Y").to_string(),
                        EntityAttributes::Date { date, date_type },
                        document_id,
                        0.8,
                    )
                    .with_mention(start, end),
                )
            })
            .collect()
    }
}
