use regex::Regex;
use std::sync::LazyLock;

use super::law::{LawMention, find_law_mentions};
use super::{EntityExtractor, compile_patterns, non_overlapping};
use crate::schema::{Entity, EntityAttributes, EntityType};
use crate::text::{collapse_whitespace, window};

static PARAGRAPH_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"§{1,2}\s*(\d+[a-z]?)\b",
        r"\bParagraph(?:en)?\s+(\d+[a-z]?)\b",
        r"\bPar\.\s*(\d+[a-z]?)\b",
    ])
});

// "§ 29 SGB IX": the law usually follows the number
const FORWARD_LAW_WINDOW: usize = 40;
const CONTEXT_RADIUS: usize = 100;
const MAX_TITLE_CHARS: usize = 100;

pub struct ParagraphExtractor {
    law_window: usize,
}

impl Default for ParagraphExtractor {
    fn default() -> Self {
        Self::new(200)
    }
}

impl ParagraphExtractor {
    pub fn new(law_window: usize) -> Self {
        Self { law_window }
    }

    /// Law code for a paragraph spanning `start..end`, "Unknown" when none is close.
    fn owning_law(&self, laws: &[LawMention], start: usize, end: usize) -> String {
        let forward = laws
            .iter()
            .filter(|law| law.start >= end && law.start - end <= FORWARD_LAW_WINDOW)
            .min_by_key(|law| law.start - end);

        let backward = || {
            laws.iter()
                .filter(|law| law.end <= start && start - law.end <= self.law_window)
                .min_by_key(|law| start - law.end)
        };

        forward
            .or_else(backward)
            .map(|law| law.code.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// Text after the citation up to the next period or newline.
fn short_title(text: &str, end: usize) -> String {
    let rest = &text[end..];
    let stop = rest.find(['.', '\n']).unwrap_or(rest.len());
    let title: String = rest[..stop].trim().chars().take(MAX_TITLE_CHARS).collect();
    title.trim().to_string()
}

impl EntityExtractor for ParagraphExtractor {
    fn entity_type(&self) -> EntityType {
        EntityType::Paragraph
    }

    fn extract(&self, text: &str, document_id: &str) -> Vec<Entity> {
        let laws = find_law_mentions(text);

        let spans: Vec<(usize, usize, String)> = PARAGRAPH_PATTERNS
            .iter()
            .flat_map(|pattern| pattern.captures_iter(text))
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let number = caps.get(1)?.as_str().to_string();
                Some((whole.start(), whole.end(), number))
            })
            .collect();

        non_overlapping(spans)
            .into_iter()
            .map(|(start, end, number)| {
                let law = self.owning_law(&laws, start, end);
                let context = collapse_whitespace(window(text, start, end, CONTEXT_RADIUS, CONTEXT_RADIUS));

                Entity::new(
                    EntityType::Paragraph,
                    format!("§{}", number),
                    EntityAttributes::Paragraph {
                        number,
                        law,
                        title: short_title(text, end),
                        context,
                    },
                    document_id,
                    0.9,
                )
                .with_mention(start, end)
            })
            .collect()
    }
}
