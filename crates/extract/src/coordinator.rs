use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use ingest::Document;

use crate::config::ExtractionConfig;
use crate::entities::{EntityExtractor, default_extractors};
use crate::normalizer::EntityNormalizer;
use crate::schema::{Entity, EntityType};

/// Runs every typed extractor over a document and folds duplicate mentions.
pub struct EntityExtractionCoordinator {
    extractors: Vec<Box<dyn EntityExtractor>>,
    normalizer: EntityNormalizer,
    min_confidence: f64,
}

impl Default for EntityExtractionCoordinator {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl EntityExtractionCoordinator {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            extractors: default_extractors(config.law_window),
            normalizer: EntityNormalizer::new(),
            min_confidence: config.min_confidence,
        }
    }

    pub fn with_normalizer(mut self, normalizer: EntityNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Add a custom extractor after the built-in ones.
    pub fn register(&mut self, extractor: Box<dyn EntityExtractor>) {
        self.extractors.push(extractor);
    }

    pub fn normalizer(&self) -> &EntityNormalizer {
        &self.normalizer
    }

    pub fn extract(&self, document: &dyn Document) -> Vec<Entity> {
        self.extract_text(document.text(), document.id())
    }

    pub fn extract_text(&self, text: &str, document_id: &str) -> Vec<Entity> {
        let raw: Vec<Entity> = self
            .extractors
            .iter()
            .flat_map(|extractor| extractor.extract(text, document_id))
            .collect();
        let raw_count = raw.len();

        let entities: Vec<Entity> = self
            .merge_mentions(deduplicate(raw))
            .into_iter()
            .filter(|e| e.confidence >= self.min_confidence)
            .collect();

        debug!(document_id, raw = raw_count, entities = entities.len(), "extracted entities");
        entities
    }

    /// Merge entities whose names normalize to the same key.
    pub fn merge_mentions(&self, entities: Vec<Entity>) -> Vec<Entity> {
        let mut groups: Vec<Vec<Entity>> = Vec::new();
        let mut index: HashMap<(EntityType, String), usize> = HashMap::new();

        for entity in entities {
            let key = (
                entity.entity_type.clone(),
                self.normalizer.normalize(&entity.name, &entity.entity_type),
            );
            match index.get(&key) {
                Some(&slot) => groups[slot].push(entity),
                None => {
                    index.insert(key, groups.len());
                    groups.push(vec![entity]);
                }
            }
        }

        groups
            .into_iter()
            .filter_map(|mut group| {
                if group.len() == 1 {
                    group.pop()
                } else {
                    merge_entities(group)
                }
            })
            .collect()
    }
}

/// Collapse exact repeats by `(type, lowercase name)`, keeping the first.
pub fn deduplicate(entities: Vec<Entity>) -> Vec<Entity> {
    let mut kept: Vec<Entity> = Vec::with_capacity(entities.len());
    let mut index: HashMap<(EntityType, String), usize> = HashMap::new();

    for entity in entities {
        let key = (entity.entity_type.clone(), entity.name.to_lowercase());
        match index.get(&key) {
            Some(&slot) => {
                let existing = &mut kept[slot];
                existing.confidence = existing.confidence.max(entity.confidence);
                existing.mentions.extend(entity.mentions);
                existing.mentions.sort();
                existing.mentions.dedup();
            }
            None => {
                index.insert(key, kept.len());
                kept.push(entity);
            }
        }
    }

    kept
}

/// Fold a group of entities describing the same thing into one.
///
/// The highest-confidence member is the base; its properties win over the
/// others'. `source_documents` and `mention_count` accumulate across the group.
pub fn merge_entities(group: Vec<Entity>) -> Option<Entity> {
    let base_idx = group
        .iter()
        .enumerate()
        .fold(None::<(usize, f64)>, |best, (idx, e)| match best {
            Some((_, conf)) if conf >= e.confidence => best,
            _ => Some((idx, e.confidence)),
        })?
        .0;

    let mut source_documents: Vec<String> = Vec::new();
    let mut mention_count = 0u64;
    let mut confidence = 0.0f64;
    let mut created_at = group[base_idx].created_at;

    for member in &group {
        for doc in member.source_documents() {
            if !source_documents.contains(&doc) {
                source_documents.push(doc);
            }
        }
        mention_count += member.mention_count();
        confidence = confidence.max(member.confidence);
        created_at = created_at.min(member.created_at);
    }

    let mut members = group;
    let mut merged = members.swap_remove(base_idx);

    for member in members {
        for (key, value) in member.properties {
            merged.properties.entry(key).or_insert(value);
        }
        if member.source_document == merged.source_document {
            merged.mentions.extend(member.mentions);
        }
    }
    merged.mentions.sort();
    merged.mentions.dedup();

    merged.properties.insert(
        "source_documents".to_string(),
        Value::from(source_documents),
    );
    merged.properties.insert("mention_count".to_string(), Value::from(mention_count));
    merged.confidence = confidence;
    merged.created_at = created_at;
    merged.updated_at = Utc::now();

    Some(merged)
}
