use ingest::Document;

use super::{RelationStrategy, positioned};
use crate::schema::{Entity, Relation, relation_types};
use crate::text::{collapse_whitespace, floor_boundary};

const PROXIMITY_CONFIDENCE: f64 = 0.6;
const MAX_CONTEXT_BYTES: usize = 300;

/// Links every pair of distinct entities mentioned close to each other.
pub struct ProximityRelationExtractor {
    window: usize,
}

impl Default for ProximityRelationExtractor {
    fn default() -> Self {
        Self::new(200)
    }
}

impl ProximityRelationExtractor {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    fn extract_text(&self, text: &str, document_id: &str, entities: &[Entity]) -> Vec<Relation> {
        let mentions = positioned(entities, None);
        let mut relations = Vec::new();

        for (i, first) in mentions.iter().enumerate() {
            for second in &mentions[i + 1..] {
                let distance = second.mention.start.saturating_sub(first.mention.end);
                if distance > self.window {
                    break;
                }
                if first.entity.id == second.entity.id {
                    continue;
                }

                let span_end = first.mention.end.max(second.mention.end).min(text.len());
                let span_start = first.mention.start.min(span_end);
                let context_end = floor_boundary(text, span_end.min(span_start + MAX_CONTEXT_BYTES));
                let context = text
                    .get(span_start..context_end)
                    .map(collapse_whitespace)
                    .unwrap_or_default();

                relations.push(
                    Relation::new(
                        relation_types::MENTIONED_WITH,
                        first.entity.id.as_str(),
                        second.entity.id.as_str(),
                        document_id,
                        PROXIMITY_CONFIDENCE,
                    )
                    .with_property("distance", distance as u64)
                    .with_property("context", context),
                );
            }
        }

        relations
    }
}

impl RelationStrategy for ProximityRelationExtractor {
    fn name(&self) -> &'static str {
        "proximity"
    }

    fn extract(&self, document: &dyn Document, entities: &[Entity]) -> Vec<Relation> {
        self.extract_text(document.text(), document.id(), entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntityAttributes, EntityType};
    use ingest::TextDocument;

    fn at(entity_type: EntityType, name: &str, start: usize, end: usize) -> Entity {
        Entity::new(entity_type, name, EntityAttributes::None, "doc-1", 0.9).with_mention(start, end)
    }

    #[test]
    fn test_pairs_within_window() {
        let text = format!("SGB IX und BGB {} GG", " ".repeat(300));
        let doc = TextDocument::new("doc-1", text.clone());
        let gg_start = text.find("GG").unwrap();
        let entities = vec![
            at(EntityType::Law, "SGB IX", 0, 6),
            at(EntityType::Law, "BGB", 11, 14),
            at(EntityType::Law, "GG", gg_start, gg_start + 2),
        ];

        let relations = ProximityRelationExtractor::default().extract(&doc, &entities);

        assert_eq!(relations.len(), 1);
        let relation = &relations[0];
        assert_eq!(relation.relation_type, "mentioned_with");
        assert_eq!(relation.confidence, 0.6);
        assert_eq!(relation.source_id, entities[0].id);
        assert_eq!(relation.target_id, entities[1].id);
        assert_eq!(relation.properties["distance"], 5);
        assert_eq!(relation.properties["context"], "SGB IX und BGB");
    }

    #[test]
    fn test_same_entity_is_not_paired() {
        let doc = TextDocument::new("doc-1", "BGB BGB");
        let entities = vec![at(EntityType::Law, "BGB", 0, 3).with_mention(4, 7)];

        assert!(ProximityRelationExtractor::default().extract(&doc, &entities).is_empty());
    }

    #[test]
    fn test_narrow_window() {
        let doc = TextDocument::new("doc-1", "SGB IX und BGB");
        let entities = vec![
            at(EntityType::Law, "SGB IX", 0, 6),
            at(EntityType::Law, "BGB", 11, 14),
        ];

        assert!(ProximityRelationExtractor::new(3).extract(&doc, &entities).is_empty());
    }
}
