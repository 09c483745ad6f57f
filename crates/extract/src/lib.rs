pub mod config;
pub mod coordinator;
pub mod entities;
pub mod normalizer;
pub mod relations;
pub mod schema;
pub mod text;

pub use config::ExtractionConfig;
pub use coordinator::{EntityExtractionCoordinator, deduplicate, merge_entities};
pub use entities::EntityExtractor;
pub use normalizer::EntityNormalizer;
pub use relations::{RelationExtractionCoordinator, RelationPattern, RelationStrategy};
pub use schema::{
    Entity, EntityAttributes, EntityType, ExtractedDocument, ExtractionResult, Mention, Relation,
    relation_types,
};

use ingest::Document;
use tracing::info;

/// Entity and relation extraction for one document at a time.
pub struct Extractor {
    entities: EntityExtractionCoordinator,
    relations: RelationExtractionCoordinator,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl Extractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            entities: EntityExtractionCoordinator::new(config),
            relations: RelationExtractionCoordinator::new(config),
        }
    }

    pub fn with_coordinators(
        entities: EntityExtractionCoordinator,
        relations: RelationExtractionCoordinator,
    ) -> Self {
        Self { entities, relations }
    }

    /// Extract entities and relations from a document
    pub fn extract_document(&self, document: &dyn Document) -> ExtractedDocument {
        let mut entities = self.entities.extract(document);
        entities.extend(self.relations.synthesize_entities(document));

        let relations = self.relations.extract(document, &entities);

        info!(
            document_id = document.id(),
            document_type = document.document_type(),
            entities = entities.len(),
            relations = relations.len(),
            "document extracted"
        );

        ExtractedDocument {
            doc_id: document.id().to_string(),
            document_type: document.document_type().to_string(),
            extraction: ExtractionResult { entities, relations },
        }
    }

    pub fn entity_coordinator(&self) -> &EntityExtractionCoordinator {
        &self.entities
    }

    pub fn relation_coordinator(&self) -> &RelationExtractionCoordinator {
        &self.relations
    }
}
