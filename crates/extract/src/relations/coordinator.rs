use std::collections::HashMap;
use tracing::debug;

use ingest::Document;

use super::{
    PatternRelationExtractor, ProximityRelationExtractor, RelationStrategy,
    StructuralRelationExtractor,
};
use crate::config::ExtractionConfig;
use crate::schema::{Entity, Relation};

/// Runs every relation strategy and folds relations that only differ in direction.
pub struct RelationExtractionCoordinator {
    strategies: Vec<Box<dyn RelationStrategy>>,
}

impl Default for RelationExtractionCoordinator {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl RelationExtractionCoordinator {
    pub fn new(config: &ExtractionConfig) -> Self {
        let mut strategies: Vec<Box<dyn RelationStrategy>> = vec![Box::new(PatternRelationExtractor::default())];
        if config.enable_proximity {
            strategies.push(Box::new(ProximityRelationExtractor::new(config.proximity_window)));
        }
        if config.enable_structural {
            strategies.push(Box::new(StructuralRelationExtractor::default()));
        }
        Self { strategies }
    }

    pub fn with_strategies(strategies: Vec<Box<dyn RelationStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn synthesize_entities(&self, document: &dyn Document) -> Vec<Entity> {
        self.strategies
            .iter()
            .flat_map(|s| s.synthesize_entities(document))
            .collect()
    }

    pub fn extract(&self, document: &dyn Document, entities: &[Entity]) -> Vec<Relation> {
        let mut all = Vec::new();
        for strategy in &self.strategies {
            let found = strategy.extract(document, entities);
            debug!(
                document_id = document.id(),
                strategy = strategy.name(),
                relations = found.len(),
                "relation strategy finished"
            );
            all.extend(found);
        }
        deduplicate_relations(all)
    }
}

/// Collapse relations sharing `(type, {source, target})`.
///
/// The first relation seen for a key keeps its direction and properties; its
/// confidence is raised to the maximum of the group.
pub fn deduplicate_relations(relations: Vec<Relation>) -> Vec<Relation> {
    let mut kept: Vec<Relation> = Vec::with_capacity(relations.len());
    let mut index: HashMap<(String, String, String), usize> = HashMap::new();

    for relation in relations {
        let key = relation.dedup_key();
        match index.get(&key) {
            Some(&slot) => {
                let existing = &mut kept[slot];
                existing.confidence = existing.confidence.max(relation.confidence);
            }
            None => {
                index.insert(key, kept.len());
                kept.push(relation);
            }
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::EntityExtractionCoordinator;
    use crate::schema::{EntityType, relation_types};
    use ingest::TextDocument;

    #[test]
    fn test_reverse_duplicates_collapse() {
        let r1 = Relation::new("mentioned_with", "a", "b", "doc", 0.6);
        let r2 = Relation::new("mentioned_with", "b", "a", "doc", 0.8);
        let r3 = Relation::new("belongs_to", "a", "b", "doc", 0.9);

        let deduped = deduplicate_relations(vec![r1.clone(), r2, r3]);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].id, r1.id);
        assert_eq!(deduped[0].source_id, "a");
        assert_eq!(deduped[0].confidence, 0.8);
    }

    #[test]
    fn test_objection_document_end_to_end() {
        let doc = TextDocument::new(
            "w-1",
            "Widerspruch gegen den Bescheid vom 15.03.2024. Das Sozialamt München ist zuständig für die Eingliederungshilfe.",
        )
        .with_document_type("Widerspruch");
        let relation_coordinator = RelationExtractionCoordinator::default();

        let mut entities = EntityExtractionCoordinator::default().extract(&doc);
        entities.extend(relation_coordinator.synthesize_entities(&doc));
        let relations = relation_coordinator.extract(&doc, &entities);

        assert!(entities.iter().any(|e| e.entity_type == EntityType::Objection));
        assert!(relations.iter().any(|r| r.relation_type == relation_types::RICHTET_SICH_GEGEN));
        assert!(relations.iter().any(|r| r.relation_type == relation_types::ZUSTAENDIG_FUER));
        assert!(relations.iter().any(|r| r.relation_type == relation_types::MENTIONED_WITH));

        let mut keys: Vec<_> = relations.iter().map(Relation::dedup_key).collect();
        let before = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), before);
    }

    #[test]
    fn test_fast_config_skips_proximity() {
        let config = ExtractionConfig {
            enable_proximity: false,
            ..ExtractionConfig::default()
        };
        let coordinator = RelationExtractionCoordinator::new(&config);

        assert_eq!(coordinator.strategy_names(), vec!["pattern", "structural"]);
    }
}
