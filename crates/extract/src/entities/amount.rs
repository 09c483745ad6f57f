use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

use super::{EntityExtractor, compile_patterns, non_overlapping};
use crate::normalizer::parse_amount;
use crate::schema::{AmountPurpose, Entity, EntityAttributes, EntityType};
use crate::text::{classify_by_keyword, window_lower};

static AMOUNT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        // 1.500,50 €  /  200 EUR  /  42,5 Euro
        r"\b(?:\d{1,3}(?:\.\d{3})+(?:,\d{1,2})?|\d+(?:[.,]\d{1,2})?)\s*(?:€|EUR\b|Euro\b)",
        // € 1.500  /  EUR 200,00
        r"(?:€|\bEUR|\bEuro)\s*(?:\d{1,3}(?:\.\d{3})+(?:,\d{1,2})?|\d+(?:[.,]\d{1,2})?)\b",
    ])
});

const PURPOSE_RADIUS: usize = 100;

const PURPOSE_KEYWORDS: &[(&str, AmountPurpose)] = &[
    ("budget", AmountPurpose::Budget),
    ("kosten", AmountPurpose::Cost),
    ("erstatt", AmountPurpose::Reimbursement),
    ("monatlich", AmountPurpose::Monthly),
    ("pro monat", AmountPurpose::Monthly),
];

pub struct AmountExtractor;

impl EntityExtractor for AmountExtractor {
    fn entity_type(&self) -> EntityType {
        EntityType::Amount
    }

    fn extract(&self, text: &str, document_id: &str) -> Vec<Entity> {
        let spans: Vec<(usize, usize, ())> = AMOUNT_PATTERNS
            .iter()
            .flat_map(|pattern| pattern.find_iter(text))
            .map(|m| (m.start(), m.end(), ()))
            .collect();

        non_overlapping(spans)
            .into_iter()
            .filter_map(|(start, end, ())| {
                let surface = text[start..end].trim();
                let Some(value) = parse_amount(surface) else {
                    trace!(surface, "skipping unparseable amount");
                    return None;
                };

                let context = window_lower(text, start, end, PURPOSE_RADIUS);
                let purpose = classify_by_keyword(&context, PURPOSE_KEYWORDS, AmountPurpose::Other);

                Some(
                    Entity::new(
                        EntityType::Amount,
                        surface,
                        EntityAttributes::Amount {
                            value,
                            currency: "EUR".to_string(),
                            purpose,
                        },
                        document_id,
                        0.85,
                    )
                    .with_mention(start, end),
                )
            })
            .collect()
    }
}
