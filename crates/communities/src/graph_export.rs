use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use index::{GraphStore, KnowledgeGraph};

/// Simple undirected projection of a knowledge graph.
///
/// Parallel and antiparallel relations collapse into one edge and self-loops
/// are dropped. Every node of the graph is present, isolated ones included.
#[derive(Debug, Clone, Default)]
pub struct GraphData {
    pub entities: Vec<String>,
    pub edges: Vec<(usize, usize)>, // (smaller_idx, larger_idx)
    pub entity_to_idx: HashMap<String, usize>,
    seen: HashSet<(usize, usize)>,
}

impl GraphData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Undirected simple projection over stored entities. Placeholder nodes
    /// and the edges touching them are left out.
    pub fn from_graph<S: GraphStore>(graph: &KnowledgeGraph<S>) -> Self {
        let mut data = Self::new();
        for node in graph.nodes() {
            if graph.contains_entity(node) {
                data.add_entity(node.to_string());
            }
        }
        for edge in graph.edges() {
            let (Some(source), Some(target)) = (data.index_of(&edge.source), data.index_of(&edge.target)) else {
                continue;
            };
            data.add_edge(source, target);
        }
        data
    }

    pub fn add_entity(&mut self, entity_id: String) -> usize {
        if let Some(&idx) = self.entity_to_idx.get(&entity_id) {
            return idx;
        }

        let idx = self.entities.len();
        self.entities.push(entity_id.clone());
        self.entity_to_idx.insert(entity_id, idx);
        idx
    }

    /// Returns `false` for self-loops and edges already present.
    pub fn add_edge(&mut self, source: usize, target: usize) -> bool {
        if source == target {
            return false;
        }
        let key = (source.min(target), source.max(target));
        if !self.seen.insert(key) {
            return false;
        }
        self.edges.push(key);
        true
    }

    pub fn node_count(&self) -> usize {
        self.entities.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Sorted neighbour lists indexed by node.
    pub fn adjacency(&self) -> Vec<Vec<usize>> {
        let mut adj = vec![Vec::new(); self.entities.len()];
        for &(a, b) in &self.edges {
            adj[a].push(b);
            adj[b].push(a);
        }
        for neighbours in &mut adj {
            neighbours.sort_unstable();
        }
        adj
    }

    pub fn index_of(&self, entity_id: &str) -> Option<usize> {
        self.entity_to_idx.get(entity_id).copied()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportNode {
    pub id: String,
    pub name: String,
    pub entity_type: String,
    pub confidence: f64,
    pub properties: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportLink {
    pub id: String,
    pub source: String,
    pub target: String,
    pub relation_type: String,
    pub confidence: f64,
}

/// Node-link document for visualisation layers.
#[derive(Debug, Clone, Serialize)]
pub struct GraphExport {
    pub domain: String,
    pub directed: bool,
    pub multigraph: bool,
    pub nodes: Vec<ExportNode>,
    pub links: Vec<ExportLink>,
}

impl GraphExport {
    pub fn from_graph<S: GraphStore>(graph: &KnowledgeGraph<S>) -> Self {
        let nodes = graph
            .nodes()
            .into_iter()
            .map(|id| match graph.get_entity(id) {
                Some(entity) => ExportNode {
                    id: entity.id.clone(),
                    name: entity.name.clone(),
                    entity_type: entity.entity_type.to_string(),
                    confidence: entity.confidence,
                    properties: Value::Object(entity.properties_map()),
                },
                None => ExportNode {
                    id: id.to_string(),
                    name: id.to_string(),
                    entity_type: "Unknown".to_string(),
                    confidence: 0.0,
                    properties: Value::Null,
                },
            })
            .collect();

        let links = graph
            .edges()
            .into_iter()
            .map(|edge| ExportLink {
                id: edge.key.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                relation_type: edge.relation_type.clone(),
                confidence: graph.get_relation(&edge.key).map_or(0.0, |r| r.confidence),
            })
            .collect();

        Self {
            domain: graph.domain().to_string(),
            directed: true,
            multigraph: true,
            nodes,
            links,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize graph export")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{Entity, EntityAttributes, EntityType, Relation};

    fn entity(name: &str) -> Entity {
        Entity::new(EntityType::Paragraph, name, EntityAttributes::None, "doc-1", 0.9)
    }

    #[test]
    fn test_projection_collapses_edges() {
        let a = entity("§1");
        let b = entity("§2");
        let mut graph = KnowledgeGraph::new("test");
        graph.add_entities([a.clone(), b.clone(), entity("§3")]);
        graph.add_relation(Relation::new("verweist_auf", a.id.as_str(), b.id.as_str(), "doc-1", 0.8));
        graph.add_relation(Relation::new("belongs_to", b.id.as_str(), a.id.as_str(), "doc-1", 0.8));
        graph.add_relation(Relation::new("verweist_auf", a.id.as_str(), a.id.as_str(), "doc-1", 0.8));

        let data = GraphData::from_graph(&graph);
        assert_eq!(data.node_count(), 3);
        assert_eq!(data.edge_count(), 1);

        let adj = data.adjacency();
        let ia = data.index_of(&a.id).unwrap();
        let ib = data.index_of(&b.id).unwrap();
        assert_eq!(adj[ia], vec![ib]);
    }

    #[test]
    fn test_projection_skips_placeholders() {
        let a = entity("§1");
        let b = entity("§2");
        let mut graph = KnowledgeGraph::new("test");
        graph.add_entities([a.clone(), b.clone()]);
        graph.add_relation(Relation::new("verweist_auf", a.id.as_str(), b.id.as_str(), "doc-1", 0.8));
        graph.add_relation(Relation::new("verweist_auf", a.id.as_str(), "paragraph_missing", "doc-1", 0.7));

        let data = GraphData::from_graph(&graph);
        assert_eq!(data.node_count(), 2);
        assert_eq!(data.edge_count(), 1);
        assert!(data.index_of("paragraph_missing").is_none());
    }

    #[test]
    fn test_export_includes_placeholders() {
        let a = entity("§1");
        let mut graph = KnowledgeGraph::new("test");
        graph.add_entity(a.clone());
        graph.add_relation(Relation::new("verweist_auf", a.id.as_str(), "paragraph_missing", "doc-1", 0.7));

        let export = GraphExport::from_graph(&graph);
        assert_eq!(export.nodes.len(), 2);
        assert_eq!(export.links.len(), 1);
        assert!(export.nodes.iter().any(|n| n.id == "paragraph_missing" && n.entity_type == "Unknown"));

        let json: Value = serde_json::from_str(&export.to_json().unwrap()).unwrap();
        assert_eq!(json["links"][0]["relation_type"], "verweist_auf");
    }
}
