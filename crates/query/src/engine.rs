use anyhow::{Context, Result};
use regex::RegexBuilder;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet, VecDeque};
use tracing::debug;

use extract::{Entity, EntityType, relation_types};
use index::{GraphStore, KnowledgeGraph, PetgraphStore};

use crate::cypher::{self, Row};

#[derive(Debug, Clone, Serialize)]
pub struct RelatedEntry {
    pub entity: Value,
    pub relation: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityContext {
    pub entity: Value,
    pub subgraph_entities: usize,
    pub subgraph_relations: usize,
    /// Outgoing relations of the entity grouped by relation type
    pub relations: BTreeMap<String, Vec<RelatedEntry>>,
}

/// Read-only queries over a knowledge graph.
pub struct GraphQueryEngine<'g, S: GraphStore = PetgraphStore> {
    graph: &'g KnowledgeGraph<S>,
}

impl<'g, S: GraphStore> GraphQueryEngine<'g, S> {
    pub fn new(graph: &'g KnowledgeGraph<S>) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &'g KnowledgeGraph<S> {
        self.graph
    }

    pub fn find_entities_by_type(&self, entity_type: &EntityType) -> Vec<&'g Entity> {
        self.graph.entities().filter(|e| &e.entity_type == entity_type).collect()
    }

    /// Case-insensitive regex search over entity names.
    pub fn find_entities_by_name(&self, pattern: &str) -> Result<Vec<&'g Entity>> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Invalid name pattern: {pattern}"))?;
        Ok(self.graph.entities().filter(|e| regex.is_match(&e.name)).collect())
    }

    pub fn find_entities_by_property(&self, name: &str, value: &Value) -> Vec<&'g Entity> {
        self.graph
            .entities()
            .filter(|e| e.property(name).as_ref() == Some(value))
            .collect()
    }

    /// Entities reachable over outgoing edges within `max_distance` hops,
    /// paired with their hop distance, nearest first.
    pub fn get_entity_neighbors(
        &self,
        entity_id: &str,
        relation_type: Option<&str>,
        max_distance: usize,
    ) -> Vec<(&'g Entity, usize)> {
        let store = self.graph.store();
        if !store.contains_node(entity_id) {
            return Vec::new();
        }

        let mut visited: HashSet<&str> = HashSet::from([entity_id]);
        let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(entity_id, 0)]);
        let mut found = Vec::new();

        while let Some((node, dist)) = queue.pop_front() {
            if dist == max_distance {
                continue;
            }
            let mut next: Vec<&str> = store
                .out_edges(node)
                .into_iter()
                .filter(|e| relation_type.is_none_or(|t| e.relation_type == t))
                .map(|e| e.target.as_str())
                .collect();
            next.sort_unstable();
            next.dedup();

            for neighbour in next {
                if !visited.insert(neighbour) {
                    continue;
                }
                if let Some(entity) = self.graph.get_entity(neighbour) {
                    found.push((entity, dist + 1));
                }
                queue.push_back((neighbour, dist + 1));
            }
        }

        found
    }

    /// Every simple directed path with at most `max_length` edges.
    pub fn find_paths_between(&self, source_id: &str, target_id: &str, max_length: usize) -> Vec<Vec<String>> {
        let store = self.graph.store();
        if source_id == target_id || !store.contains_node(source_id) || !store.contains_node(target_id) {
            return Vec::new();
        }

        let mut paths = Vec::new();
        let mut path: Vec<&str> = vec![source_id];
        let mut on_path: HashSet<&str> = HashSet::from([source_id]);
        self.walk_paths(target_id, max_length, &mut path, &mut on_path, &mut paths);
        paths
    }

    fn walk_paths<'a>(
        &'a self,
        target: &str,
        max_length: usize,
        path: &mut Vec<&'a str>,
        on_path: &mut HashSet<&'a str>,
        paths: &mut Vec<Vec<String>>,
    ) {
        if path.len() > max_length {
            return;
        }
        let Some(&last) = path.last() else { return };

        for next in self.graph.store().successors(last) {
            if next == target {
                paths.push(path.iter().map(|s| s.to_string()).chain([target.to_string()]).collect());
                continue;
            }
            if on_path.insert(next) {
                path.push(next);
                self.walk_paths(target, max_length, path, on_path, paths);
                path.pop();
                on_path.remove(next);
            }
        }
    }

    /// Laws the paragraph `§{number}` belongs to.
    pub fn find_related_laws(&self, paragraph_number: &str) -> Vec<&'g Entity> {
        let name = format!("§{}", paragraph_number.trim().trim_start_matches('§').trim());
        let mut seen = HashSet::new();
        let mut laws = Vec::new();

        for paragraph in self
            .graph
            .entities()
            .filter(|e| e.entity_type == EntityType::Paragraph && e.name == name)
        {
            for relation in self.graph.outgoing_relations(&paragraph.id) {
                if relation.relation_type != relation_types::BELONGS_TO {
                    continue;
                }
                let Some(law) = self.graph.get_entity(&relation.target_id) else {
                    continue;
                };
                if law.entity_type == EntityType::Law && seen.insert(law.id.as_str()) {
                    laws.push(law);
                }
            }
        }

        debug!(paragraph = %name, laws = laws.len(), "related laws");
        laws
    }

    /// Authorities with a `zuständig_für` edge into a service named
    /// `service_name` (case-insensitive).
    pub fn find_authorities_responsible_for_service(&self, service_name: &str) -> Vec<&'g Entity> {
        let wanted = service_name.trim().to_lowercase();
        let mut seen = HashSet::new();
        let mut authorities = Vec::new();

        for service in self
            .graph
            .entities()
            .filter(|e| e.entity_type == EntityType::Service && e.name.to_lowercase() == wanted)
        {
            for relation in self.graph.incoming_relations(&service.id) {
                if relation.relation_type != relation_types::ZUSTAENDIG_FUER {
                    continue;
                }
                let Some(authority) = self.graph.get_entity(&relation.source_id) else {
                    continue;
                };
                if authority.entity_type == EntityType::Authority && seen.insert(authority.id.as_str()) {
                    authorities.push(authority);
                }
            }
        }

        authorities
    }

    /// The entity plus its outgoing relations inside a `depth`-hop
    /// neighbourhood, grouped by relation type.
    pub fn get_entity_context(&self, entity_id: &str, depth: usize) -> Option<EntityContext> {
        let entity = self.graph.get_entity(entity_id)?;
        let subgraph = self.graph.get_subgraph([entity_id], depth);

        let mut relations: BTreeMap<String, Vec<RelatedEntry>> = BTreeMap::new();
        for relation in subgraph.outgoing_relations(entity_id) {
            let target = subgraph
                .get_entity(&relation.target_id)
                .map_or(Value::Null, Entity::to_value);
            relations
                .entry(relation.relation_type.clone())
                .or_default()
                .push(RelatedEntry {
                    entity: target,
                    relation: relation.to_value(),
                });
        }

        Some(EntityContext {
            entity: entity.to_value(),
            subgraph_entities: subgraph.entity_count(),
            subgraph_relations: subgraph.relation_count(),
            relations,
        })
    }

    /// `MATCH (a:TypeA)-[:rel]->(b:TypeB) RETURN a, b`; other shapes yield no rows.
    pub fn cypher_like_query(&self, query: &str) -> Vec<Row> {
        cypher::run(self.graph, query)
    }
}
