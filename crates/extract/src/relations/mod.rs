//! Relation inference strategies.
//!
//! Every strategy sees the already-merged entity list of one document and the
//! document itself. Mention spans recorded by the entity extractors are the only
//! positional information they use.

pub mod coordinator;
pub mod pattern;
pub mod proximity;
pub mod structural;

pub use coordinator::{RelationExtractionCoordinator, deduplicate_relations};
pub use pattern::{PatternRelationExtractor, RelationPattern};
pub use proximity::ProximityRelationExtractor;
pub use structural::StructuralRelationExtractor;

use ingest::Document;

use crate::schema::{Entity, EntityType, Mention, Relation};

pub trait RelationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, document: &dyn Document, entities: &[Entity]) -> Vec<Relation>;

    /// Entities derived from the document as a whole rather than its text.
    fn synthesize_entities(&self, _document: &dyn Document) -> Vec<Entity> {
        Vec::new()
    }
}

/// One mention of one entity, flattened for positional scans.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Positioned<'a> {
    pub entity: &'a Entity,
    pub mention: Mention,
}

/// Every mention of every entity (optionally of one type), sorted by start.
pub(crate) fn positioned<'a>(entities: &'a [Entity], entity_type: Option<&EntityType>) -> Vec<Positioned<'a>> {
    let mut out: Vec<Positioned<'a>> = entities
        .iter()
        .filter(|e| entity_type.is_none_or(|t| &e.entity_type == t))
        .flat_map(|entity| entity.mentions.iter().map(move |&mention| Positioned { entity, mention }))
        .collect();
    out.sort_by_key(|p| (p.mention.start, p.mention.end));
    out
}
