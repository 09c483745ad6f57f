use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use extract::EntityType;
use index::GraphStore;

use crate::GraphAnalytics;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelationTypeStats {
    pub count: usize,
    pub source_types: BTreeMap<String, usize>,
    pub target_types: BTreeMap<String, usize>,
    pub mean_confidence: f64,
}

/// A pair that is connected indirectly but lacks a direct edge of the
/// requested type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingRelation {
    pub source_id: String,
    pub target_id: String,
    pub relation_type: String,
    /// Edges on the shortest existing path
    pub path_length: usize,
}

impl<'g, S: GraphStore> GraphAnalytics<'g, S> {
    fn type_name(&self, entity_id: &str) -> String {
        self.graph
            .get_entity(entity_id)
            .map_or_else(|| "Unknown".to_string(), |e| e.entity_type.to_string())
    }

    pub fn analyze_relation_types(&self) -> BTreeMap<String, RelationTypeStats> {
        let mut stats: BTreeMap<String, RelationTypeStats> = BTreeMap::new();
        for relation in self.graph.relations() {
            let entry = stats.entry(relation.relation_type.clone()).or_default();
            entry.count += 1;
            entry.mean_confidence += relation.confidence;
            *entry.source_types.entry(self.type_name(&relation.source_id)).or_insert(0) += 1;
            *entry.target_types.entry(self.type_name(&relation.target_id)).or_insert(0) += 1;
        }
        for entry in stats.values_mut() {
            entry.mean_confidence /= entry.count as f64;
        }
        stats
    }

    /// Pairs of the given types with no direct `relation_type` edge but a
    /// directed path of at most `missing_relation_max_hops` edges.
    pub fn find_missing_relations(
        &self,
        relation_type: &str,
        source_type: &EntityType,
        target_type: &EntityType,
    ) -> Vec<MissingRelation> {
        let max_hops = self.config.missing_relation_max_hops;
        let sources: Vec<_> = self.graph.entities().filter(|e| &e.entity_type == source_type).collect();
        let targets: Vec<_> = self.graph.entities().filter(|e| &e.entity_type == target_type).collect();

        let mut missing = Vec::new();
        for source in &sources {
            let direct: Vec<&str> = self
                .graph
                .outgoing_relations(&source.id)
                .into_iter()
                .filter(|r| r.relation_type == relation_type)
                .map(|r| r.target_id.as_str())
                .collect();

            for target in &targets {
                if source.id == target.id || direct.contains(&target.id.as_str()) {
                    continue;
                }
                if let Some(path) = self.graph.find_path(&source.id, &target.id, max_hops) {
                    missing.push(MissingRelation {
                        source_id: source.id.clone(),
                        target_id: target.id.clone(),
                        relation_type: relation_type.to_string(),
                        path_length: path.len() - 1,
                    });
                }
            }
        }

        debug!(relation_type, candidates = missing.len(), "missing relation candidates");
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{entity, link};
    use index::KnowledgeGraph;

    #[test]
    fn test_relation_type_stats() {
        let law = entity(EntityType::Law, "SGB IX", 0.95);
        let p1 = entity(EntityType::Paragraph, "§1", 0.9);
        let p2 = entity(EntityType::Paragraph, "§2", 0.9);
        let mut graph = KnowledgeGraph::new("test");
        graph.add_entities([law.clone(), p1.clone(), p2.clone()]);
        link(&mut graph, "belongs_to", &p1, &law);
        link(&mut graph, "belongs_to", &p2, &law);
        link(&mut graph, "verweist_auf", &p1, &p2);

        let stats = GraphAnalytics::new(&graph).analyze_relation_types();
        assert_eq!(stats.len(), 2);
        let belongs = &stats["belongs_to"];
        assert_eq!(belongs.count, 2);
        assert_eq!(belongs.source_types["Paragraph"], 2);
        assert_eq!(belongs.target_types["Law"], 2);
        assert!((belongs.mean_confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_missing_relations() {
        let law = entity(EntityType::Law, "SGB IX", 0.95);
        let p1 = entity(EntityType::Paragraph, "§1", 0.9);
        let p2 = entity(EntityType::Paragraph, "§2", 0.9);
        let far = entity(EntityType::Paragraph, "§3", 0.9);
        let mut graph = KnowledgeGraph::new("test");
        graph.add_entities([law.clone(), p1.clone(), p2.clone(), far.clone()]);
        link(&mut graph, "belongs_to", &p2, &law);
        link(&mut graph, "verweist_auf", &p1, &p2);

        let missing = GraphAnalytics::new(&graph).find_missing_relations(
            "belongs_to",
            &EntityType::Paragraph,
            &EntityType::Law,
        );
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].source_id, p1.id);
        assert_eq!(missing[0].target_id, law.id);
        assert_eq!(missing[0].path_length, 2);
    }
}
