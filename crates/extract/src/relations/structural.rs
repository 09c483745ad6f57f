use ingest::Document;

use super::RelationStrategy;
use crate::schema::{Entity, EntityAttributes, EntityType, Relation, relation_types};

const OBJECTION_DOCUMENT_TYPE: &str = "Widerspruch";

/// Relations implied by the kind of document rather than by its wording.
///
/// An objection letter (`Widerspruch`) becomes an entity of its own that is
/// directed against every decision (`Bescheid`) it mentions.
pub struct StructuralRelationExtractor {
    entity_confidence: f64,
    relation_confidence: f64,
}

impl Default for StructuralRelationExtractor {
    fn default() -> Self {
        Self {
            entity_confidence: 1.0,
            relation_confidence: 0.9,
        }
    }
}

impl StructuralRelationExtractor {
    fn is_objection(document: &dyn Document) -> bool {
        document.document_type().eq_ignore_ascii_case(OBJECTION_DOCUMENT_TYPE)
    }

    fn objection_entity(&self, document: &dyn Document) -> Entity {
        Entity::new(
            EntityType::Objection,
            format!("{} {}", OBJECTION_DOCUMENT_TYPE, document.id()),
            EntityAttributes::Objection {
                document_id: document.id().to_string(),
                title: document.title().map(str::to_string),
                author: document.author().map(str::to_string),
            },
            document.id(),
            self.entity_confidence,
        )
    }
}

impl RelationStrategy for StructuralRelationExtractor {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn synthesize_entities(&self, document: &dyn Document) -> Vec<Entity> {
        if Self::is_objection(document) {
            vec![self.objection_entity(document)]
        } else {
            Vec::new()
        }
    }

    fn extract(&self, document: &dyn Document, entities: &[Entity]) -> Vec<Relation> {
        if !Self::is_objection(document) {
            return Vec::new();
        }

        let objection = self.objection_entity(document);
        entities
            .iter()
            .filter(|e| e.entity_type == EntityType::Decision)
            .map(|decision| {
                Relation::new(
                    relation_types::RICHTET_SICH_GEGEN,
                    objection.id.as_str(),
                    decision.id.as_str(),
                    document.id(),
                    self.relation_confidence,
                )
                .with_property("rule", "objection_against_decision")
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest::TextDocument;

    fn decision(name: &str) -> Entity {
        Entity::new(EntityType::Decision, name, EntityAttributes::None, "w-1", 0.8)
    }

    #[test]
    fn test_objection_targets_every_decision() {
        let doc = TextDocument::new("w-1", "Hiermit lege ich Widerspruch ein.")
            .with_document_type("Widerspruch")
            .with_title("Widerspruch Eingliederungshilfe");
        let extractor = StructuralRelationExtractor::default();

        let synthesized = extractor.synthesize_entities(&doc);
        assert_eq!(synthesized.len(), 1);
        assert_eq!(synthesized[0].entity_type, EntityType::Objection);
        assert_eq!(synthesized[0].name, "Widerspruch w-1");
        assert_eq!(
            synthesized[0].property("title"),
            Some(serde_json::json!("Widerspruch Eingliederungshilfe"))
        );

        let entities = vec![decision("Bescheid vom 01.02.2024"), decision("Ablehnungsbescheid")];
        let relations = extractor.extract(&doc, &entities);

        assert_eq!(relations.len(), 2);
        assert!(relations.iter().all(|r| r.relation_type == "richtet_sich_gegen"));
        assert!(relations.iter().all(|r| r.source_id == synthesized[0].id));
    }

    #[test]
    fn test_other_documents_are_ignored() {
        let doc = TextDocument::new("b-1", "Text").with_document_type("Bescheid");
        let extractor = StructuralRelationExtractor::default();

        assert!(extractor.synthesize_entities(&doc).is_empty());
        assert!(extractor.extract(&doc, &[decision("Bescheid")]).is_empty());
    }
}
