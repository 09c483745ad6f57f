use anyhow::{Context, Result};
use regex::Regex;
use std::sync::LazyLock;

use ingest::Document;

use super::{Positioned, RelationStrategy, positioned};
use crate::entities::compile_patterns;
use crate::schema::{Entity, EntityType, Relation, relation_types};

/// A trigger phrase that links the nearest source entity before it to the
/// nearest target entity after it.
#[derive(Debug, Clone)]
pub struct RelationPattern {
    pub relation_type: String,
    pub source_type: EntityType,
    pub target_type: EntityType,
    pub patterns: Vec<Regex>,
    pub confidence: f64,
}

impl RelationPattern {
    pub fn new(
        relation_type: impl Into<String>,
        source_type: EntityType,
        target_type: EntityType,
        patterns: &[&str],
        confidence: f64,
    ) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("invalid relation pattern: {p}")))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            relation_type: relation_type.into(),
            source_type,
            target_type,
            patterns,
            confidence,
        })
    }

    fn built_in(
        relation_type: &str,
        source_type: EntityType,
        target_type: EntityType,
        patterns: &[&str],
        confidence: f64,
    ) -> Self {
        Self {
            relation_type: relation_type.to_string(),
            source_type,
            target_type,
            patterns: compile_patterns(patterns),
            confidence,
        }
    }
}

static DEFAULT_PATTERNS: LazyLock<Vec<RelationPattern>> = LazyLock::new(|| {
    vec![
        RelationPattern::built_in(
            relation_types::BELONGS_TO,
            EntityType::Paragraph,
            EntityType::Law,
            &[
                r"(?:§{1,2}|\bParagraph(?:en)?|\bPar\.)\s*\d+[a-z]?\s*(?:Abs(?:atz|\.)\s*\d+\s*)?(?:(?:S(?:atz|\.)|Nr\.)\s*\d+\s*)?(?:des\s+|der\s+)?(?:SGB|Sozialgesetzbuch|BGB|GG|SGG|VwVfG|VwGO|BTHG|AsylbLG)",
            ],
            0.9,
        ),
        RelationPattern::built_in(
            relation_types::VERWEIST_AUF,
            EntityType::Paragraph,
            EntityType::Paragraph,
            &[r"(?:\bgemäß|\bnach|\bim\s+Sinne\s+des|\bentsprechend|\bi\.\s?V\.\s?m\.)\s+§{1,2}\s*\d+[a-z]?"],
            0.85,
        ),
        RelationPattern::built_in(
            relation_types::ZUSTAENDIG_FUER,
            EntityType::Authority,
            EntityType::Service,
            &[r"(?i)\bzuständig(?:keit)?\b", r"(?i)\b(?:gewährt|erbringt|übernimmt)\b", r"(?i)\bTräger\s+de[rs]\b"],
            0.8,
        ),
        RelationPattern::built_in(
            relation_types::BETRIFFT,
            EntityType::Decision,
            EntityType::Service,
            &[r"(?i)\b(?:betrifft|betreffend|bezüglich|hinsichtlich)\b", r"(?i)\b(?:bewilligt|abgelehnt|gewährt)\b"],
            0.75,
        ),
        RelationPattern::built_in(
            relation_types::FRIST_FUER,
            EntityType::Date,
            EntityType::Procedure,
            &[
                r"(?i)\b(?:bis\s+(?:zum\s+|spätestens\s+)?|spätestens\s+(?:am\s+|zum\s+)?)\d{1,2}\.\s?\d{1,2}\.\s?\d{4}",
                r"(?i)\bfrist\w*\b",
            ],
            0.75,
        ),
    ]
});

pub struct PatternRelationExtractor {
    patterns: Vec<RelationPattern>,
}

impl Default for PatternRelationExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERNS.clone())
    }
}

impl PatternRelationExtractor {
    pub fn new(patterns: Vec<RelationPattern>) -> Self {
        Self { patterns }
    }

    pub fn add_pattern(&mut self, pattern: RelationPattern) {
        self.patterns.push(pattern);
    }

    pub fn patterns(&self) -> &[RelationPattern] {
        &self.patterns
    }

    fn extract_text(&self, text: &str, document_id: &str, entities: &[Entity]) -> Vec<Relation> {
        let mut relations = Vec::new();

        for pattern in &self.patterns {
            let sources = positioned(entities, Some(&pattern.source_type));
            let targets = positioned(entities, Some(&pattern.target_type));
            if sources.is_empty() || targets.is_empty() {
                continue;
            }

            for regex in &pattern.patterns {
                for m in regex.find_iter(text) {
                    let Some(source) = nearest_source(&sources, m.start(), m.end()) else {
                        continue;
                    };
                    let Some(target) = nearest_target(&targets, m.start()) else {
                        continue;
                    };

                    relations.push(
                        Relation::new(
                            pattern.relation_type.as_str(),
                            source.entity.id.as_str(),
                            target.entity.id.as_str(),
                            document_id,
                            pattern.confidence,
                        )
                        .with_property("pattern", regex.as_str())
                        .with_property("matched_text", m.as_str()),
                    );
                }
            }
        }

        relations
    }
}

/// Closest mention starting before the match, else the first one inside it.
fn nearest_source<'a>(sources: &[Positioned<'a>], start: usize, end: usize) -> Option<Positioned<'a>> {
    sources
        .iter()
        .filter(|p| p.mention.start < start)
        .max_by_key(|p| p.mention.start)
        .or_else(|| {
            sources
                .iter()
                .filter(|p| p.mention.start >= start && p.mention.start < end)
                .min_by_key(|p| p.mention.start)
        })
        .copied()
}

/// Closest mention starting at or after the match start.
fn nearest_target<'a>(targets: &[Positioned<'a>], start: usize) -> Option<Positioned<'a>> {
    targets
        .iter()
        .filter(|p| p.mention.start >= start)
        .min_by_key(|p| p.mention.start)
        .copied()
}

impl RelationStrategy for PatternRelationExtractor {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn extract(&self, document: &dyn Document, entities: &[Entity]) -> Vec<Relation> {
        self.extract_text(document.text(), document.id(), entities)
    }
}
