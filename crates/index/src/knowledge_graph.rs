use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use tracing::debug;

use extract::{Entity, Relation};

use crate::store::{EdgeRecord, GraphStore, PetgraphStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalDirection {
    Incoming,
    Outgoing,
    Both,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphStats {
    pub domain: String,
    pub entity_count: usize,
    pub relation_count: usize,
    pub node_count: usize,
    pub edge_count: usize,
    /// Nodes created by relations whose endpoint entity was never added
    pub placeholder_nodes: usize,
    pub entities_by_type: BTreeMap<String, usize>,
    pub relations_by_type: BTreeMap<String, usize>,
}

/// Entities and relations of one domain plus their graph topology.
///
/// The graph owns everything added to it. Re-adding an entity or relation with
/// an existing id replaces the stored value.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph<S: GraphStore = PetgraphStore> {
    pub(crate) domain: String,
    pub(crate) store: S,
    pub(crate) entity_index: BTreeMap<String, Entity>,
    pub(crate) relation_index: BTreeMap<String, Relation>,
}

impl KnowledgeGraph<PetgraphStore> {
    pub fn new(domain: impl Into<String>) -> Self {
        Self::with_store(domain, PetgraphStore::default())
    }
}

impl<S: GraphStore> KnowledgeGraph<S> {
    pub fn with_store(domain: impl Into<String>, store: S) -> Self {
        Self {
            domain: domain.into(),
            store,
            entity_index: BTreeMap::new(),
            relation_index: BTreeMap::new(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_empty(&self) -> bool {
        self.store.node_count() == 0
    }

    pub fn add_entity(&mut self, entity: Entity) {
        self.store.add_node(&entity.id);
        self.entity_index.insert(entity.id.clone(), entity);
    }

    pub fn add_entities(&mut self, entities: impl IntoIterator<Item = Entity>) {
        for entity in entities {
            self.add_entity(entity);
        }
    }

    /// Missing endpoints become bare placeholder nodes.
    pub fn add_relation(&mut self, relation: Relation) {
        for endpoint in [&relation.source_id, &relation.target_id] {
            if !self.entity_index.contains_key(endpoint.as_str()) {
                debug!(
                    domain = %self.domain,
                    relation_id = %relation.id,
                    entity_id = %endpoint,
                    "relation references unknown entity; creating placeholder node"
                );
            }
        }

        self.store.add_edge(EdgeRecord {
            key: relation.id.clone(),
            source: relation.source_id.clone(),
            target: relation.target_id.clone(),
            relation_type: relation.relation_type.clone(),
        });
        self.relation_index.insert(relation.id.clone(), relation);
    }

    pub fn add_relations(&mut self, relations: impl IntoIterator<Item = Relation>) {
        for relation in relations {
            self.add_relation(relation);
        }
    }

    pub fn get_entity(&self, id: &str) -> Option<&Entity> {
        self.entity_index.get(id)
    }

    pub fn get_relation(&self, id: &str) -> Option<&Relation> {
        self.relation_index.get(id)
    }

    /// The stored relation `relation` collapses into: same id, or same type
    /// between the same two entities in either direction.
    pub fn find_equivalent_relation(&self, relation: &Relation) -> Option<&Relation> {
        if let Some(existing) = self.relation_index.get(&relation.id) {
            return Some(existing);
        }
        let key = relation.dedup_key();
        self.outgoing_relations(&relation.source_id)
            .into_iter()
            .chain(self.incoming_relations(&relation.source_id))
            .find(|existing| existing.dedup_key() == key)
    }

    pub fn contains_entity(&self, id: &str) -> bool {
        self.entity_index.contains_key(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entity_index.values()
    }

    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relation_index.values()
    }

    pub fn entity_index(&self) -> &BTreeMap<String, Entity> {
        &self.entity_index
    }

    pub fn relation_index(&self) -> &BTreeMap<String, Relation> {
        &self.relation_index
    }

    pub fn entity_count(&self) -> usize {
        self.entity_index.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relation_index.len()
    }

    /// Node ids, placeholders included.
    pub fn nodes(&self) -> Vec<&str> {
        self.store.node_ids()
    }

    pub fn edges(&self) -> Vec<&EdgeRecord> {
        self.store.edges()
    }

    pub fn degree(&self, id: &str) -> usize {
        self.store.degree(id)
    }

    /// Relations leaving `id`, in insertion order.
    pub fn outgoing_relations(&self, id: &str) -> Vec<&Relation> {
        self.store
            .out_edges(id)
            .into_iter()
            .filter_map(|e| self.relation_index.get(&e.key))
            .collect()
    }

    pub fn incoming_relations(&self, id: &str) -> Vec<&Relation> {
        self.store
            .in_edges(id)
            .into_iter()
            .filter_map(|e| self.relation_index.get(&e.key))
            .collect()
    }

    /// Entities adjacent to `id`, optionally only over edges of one type.
    pub fn get_related_entities(
        &self,
        id: &str,
        relation_type: Option<&str>,
        direction: TraversalDirection,
    ) -> Vec<&Entity> {
        let wanted = |edge: &&EdgeRecord| relation_type.is_none_or(|t| edge.relation_type == t);
        let mut related: BTreeSet<&str> = BTreeSet::new();

        if matches!(direction, TraversalDirection::Outgoing | TraversalDirection::Both) {
            related.extend(self.store.out_edges(id).into_iter().filter(wanted).map(|e| e.target.as_str()));
        }
        if matches!(direction, TraversalDirection::Incoming | TraversalDirection::Both) {
            related.extend(self.store.in_edges(id).into_iter().filter(wanted).map(|e| e.source.as_str()));
        }

        related
            .into_iter()
            .filter_map(|other| self.entity_index.get(other))
            .collect()
    }

    /// Shortest directed path of at most `max_length` edges.
    pub fn find_path(&self, source_id: &str, target_id: &str, max_length: usize) -> Option<Vec<String>> {
        self.store.shortest_path(source_id, target_id, max_length)
    }

    /// Expand `entity_ids` by `depth` hops in both directions and copy the
    /// induced part of the graph.
    pub fn get_subgraph<'a>(&self, entity_ids: impl IntoIterator<Item = &'a str>, depth: usize) -> Self {
        let mut keep: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();

        for id in entity_ids {
            if self.store.contains_node(id) && keep.insert(id) {
                queue.push_back((id, 0));
            }
        }

        while let Some((node, dist)) = queue.pop_front() {
            if dist == depth {
                continue;
            }
            let neighbours = self
                .store
                .successors(node)
                .into_iter()
                .chain(self.store.predecessors(node));
            for next in neighbours {
                if keep.insert(next) {
                    queue.push_back((next, dist + 1));
                }
            }
        }

        let mut sub = Self::with_store(self.domain.clone(), S::default());
        for node in self.store.node_ids() {
            if !keep.contains(node) {
                continue;
            }
            match self.entity_index.get(node) {
                Some(entity) => sub.add_entity(entity.clone()),
                None => {
                    sub.store.add_node(node);
                }
            }
        }
        for relation in self.relation_index.values() {
            if keep.contains(relation.source_id.as_str()) && keep.contains(relation.target_id.as_str()) {
                sub.add_relation(relation.clone());
            }
        }
        sub
    }

    pub fn stats(&self) -> GraphStats {
        let mut entities_by_type = BTreeMap::new();
        for entity in self.entity_index.values() {
            *entities_by_type.entry(entity.entity_type.to_string()).or_insert(0) += 1;
        }
        let mut relations_by_type = BTreeMap::new();
        for relation in self.relation_index.values() {
            *relations_by_type.entry(relation.relation_type.clone()).or_insert(0) += 1;
        }

        let placeholder_nodes = self
            .store
            .node_ids()
            .into_iter()
            .filter(|id| !self.entity_index.contains_key(*id))
            .count();

        GraphStats {
            domain: self.domain.clone(),
            entity_count: self.entity_index.len(),
            relation_count: self.relation_index.len(),
            node_count: self.store.node_count(),
            edge_count: self.store.edge_count(),
            placeholder_nodes,
            entities_by_type,
            relations_by_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{EntityAttributes, EntityType};

    fn entity(entity_type: EntityType, name: &str) -> Entity {
        Entity::new(entity_type, name, EntityAttributes::None, "doc-1", 0.9)
    }

    fn relation(kind: &str, source: &Entity, target: &Entity) -> Relation {
        Relation::new(kind, source.id.as_str(), target.id.as_str(), "doc-1", 0.8)
    }

    fn chain() -> (KnowledgeGraph, Vec<Entity>) {
        let a = entity(EntityType::Paragraph, "§29");
        let b = entity(EntityType::Law, "SGB IX");
        let c = entity(EntityType::Authority, "Sozialamt");
        let d = entity(EntityType::Service, "Eingliederungshilfe");

        let mut graph = KnowledgeGraph::new("test");
        graph.add_entities([a.clone(), b.clone(), c.clone(), d.clone()]);
        graph.add_relations([
            relation("belongs_to", &a, &b),
            relation("zuständig_für", &c, &d),
            relation("verweist_auf", &b, &c),
        ]);
        (graph, vec![a, b, c, d])
    }

    #[test]
    fn test_upsert_semantics() {
        let mut graph = KnowledgeGraph::new("test");
        let first = entity(EntityType::Law, "BGB");
        let mut second = first.clone();
        second.confidence = 0.5;

        graph.add_entity(first);
        graph.add_entity(second.clone());

        assert_eq!(graph.entity_count(), 1);
        assert_eq!(graph.get_entity(&second.id).map(|e| e.confidence), Some(0.5));
        assert!(graph.get_entity("missing").is_none());
        assert!(graph.get_relation("missing").is_none());
    }

    #[test]
    fn test_equivalent_relation_ignores_direction() {
        let (graph, e) = chain();

        let reversed = relation("belongs_to", &e[1], &e[0]);
        let found = graph.find_equivalent_relation(&reversed).map(|r| r.id.clone());
        assert_eq!(found, Some(relation("belongs_to", &e[0], &e[1]).id));

        assert!(graph.find_equivalent_relation(&relation("verweist_auf", &e[1], &e[0])).is_none());
        assert!(graph.find_equivalent_relation(&relation("belongs_to", &e[0], &e[2])).is_none());
    }

    #[test]
    fn test_related_entities_by_direction() {
        let (graph, e) = chain();

        let out: Vec<&str> = graph
            .get_related_entities(&e[1].id, None, TraversalDirection::Outgoing)
            .iter()
            .map(|x| x.name.as_str())
            .collect();
        assert_eq!(out, vec!["Sozialamt"]);

        let incoming = graph.get_related_entities(&e[1].id, None, TraversalDirection::Incoming);
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].id, e[0].id);

        let both = graph.get_related_entities(&e[1].id, Some("belongs_to"), TraversalDirection::Both);
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].id, e[0].id);
    }

    #[test]
    fn test_find_path() {
        let (graph, e) = chain();

        let path = graph.find_path(&e[0].id, &e[3].id, 5).unwrap();
        assert_eq!(path.len(), 4);
        assert!(graph.find_path(&e[0].id, &e[3].id, 2).is_none());
        assert!(graph.find_path(&e[3].id, &e[0].id, 5).is_none());
        assert!(graph.find_path("nope", &e[0].id, 5).is_none());
    }

    #[test]
    fn test_subgraph_expansion() {
        let (graph, e) = chain();

        let sub = graph.get_subgraph([e[1].id.as_str()], 1);
        assert_eq!(sub.entity_count(), 3);
        assert!(!sub.contains_entity(&e[3].id));
        assert_eq!(sub.relation_count(), 2);

        let whole = graph.get_subgraph([e[0].id.as_str()], 3);
        assert_eq!(whole.entity_count(), 4);
        assert_eq!(whole.relation_count(), 3);
    }

    #[test]
    fn test_placeholder_nodes_in_stats() {
        let mut graph = KnowledgeGraph::new("test");
        let a = entity(EntityType::Law, "BGB");
        graph.add_entity(a.clone());
        graph.add_relation(Relation::new("verweist_auf", a.id.as_str(), "law_unknown", "doc-1", 0.5));

        let stats = graph.stats();
        assert_eq!(stats.entity_count, 1);
        assert_eq!(stats.node_count, 2);
        assert_eq!(stats.placeholder_nodes, 1);
        assert_eq!(stats.relations_by_type.get("verweist_auf"), Some(&1));
        assert!(graph.get_related_entities(&a.id, None, TraversalDirection::Both).is_empty());
    }
}
